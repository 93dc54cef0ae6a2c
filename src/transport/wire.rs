//! Byte-level framing shared by every [`super::Transport`] implementation.
//!
//! Fixed primitives (`i32`, `f64`, `bool`) are written raw, native-endian,
//! with no length prefix, per the wire-format compatibility constraint in
//! §6: participants are assumed homogeneous, so there is no attempt to
//! normalize to a fixed endianness. Variable-length payloads (strings,
//! `f64`/`i32` arrays) are prefixed with a `u32` element count.

use std::io::{self, Read, Write};

pub fn write_i32<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_all(&value.to_ne_bytes())
}

pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

pub fn write_f64<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    w.write_all(&value.to_ne_bytes())
}

pub fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_ne_bytes(buf))
}

pub fn write_bool<W: Write>(w: &mut W, value: bool) -> io::Result<()> {
    w.write_all(&[value as u8])
}

pub fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

pub fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    write_i32(w, bytes.len() as i32)?;
    w.write_all(bytes)
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_i32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write_doubles<W: Write>(w: &mut W, values: &[f64]) -> io::Result<()> {
    write_i32(w, values.len() as i32)?;
    for &v in values {
        write_f64(w, v)?;
    }
    Ok(())
}

pub fn read_doubles<R: Read>(r: &mut R) -> io::Result<Vec<f64>> {
    let len = read_i32(r)? as usize;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(read_f64(r)?);
    }
    Ok(values)
}

pub fn write_ints<W: Write>(w: &mut W, values: &[i32]) -> io::Result<()> {
    write_i32(w, values.len() as i32)?;
    for &v in values {
        write_i32(w, v)?;
    }
    Ok(())
}

pub fn read_ints<R: Read>(r: &mut R) -> io::Result<Vec<i32>> {
    let len = read_i32(r)? as usize;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(read_i32(r)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -7).unwrap();
        write_f64(&mut buf, 3.5).unwrap();
        write_bool(&mut buf, true).unwrap();
        write_string(&mut buf, "fluid").unwrap();
        write_doubles(&mut buf, &[1.0, 2.0, 3.0]).unwrap();
        write_ints(&mut buf, &[4, 5]).unwrap();

        let mut cursor = &buf[..];
        assert_eq!(read_i32(&mut cursor).unwrap(), -7);
        assert_eq!(read_f64(&mut cursor).unwrap(), 3.5);
        assert_eq!(read_bool(&mut cursor).unwrap(), true);
        assert_eq!(read_string(&mut cursor).unwrap(), "fluid");
        assert_eq!(read_doubles(&mut cursor).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(read_ints(&mut cursor).unwrap(), vec![4, 5]);
        assert!(cursor.is_empty());
    }
}
