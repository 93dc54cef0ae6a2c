//! A transport that refuses every call.
//!
//! Stands in wherever a `Transport` value is structurally required but must
//! never actually be invoked — the deliberate-panic-on-use role the §9
//! design notes ask `CouplingData`'s map lookup to avoid; `NullTransport`
//! plays that role here instead, for channels rather than map entries.

use super::Transport;
use std::io;

pub struct NullTransport {}

impl NullTransport {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "cannot send or receive on a null transport")
}

impl Transport for NullTransport {
    fn send_int(&mut self, _value: i32) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_double(&mut self, _value: f64) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_bool(&mut self, _value: bool) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_string(&mut self, _value: &str) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_doubles(&mut self, _values: &[f64]) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_ints(&mut self, _values: &[i32]) -> io::Result<()> {
        Err(unsupported())
    }

    fn receive_int(&mut self) -> io::Result<i32> {
        Err(unsupported())
    }

    fn receive_double(&mut self) -> io::Result<f64> {
        Err(unsupported())
    }

    fn receive_bool(&mut self) -> io::Result<bool> {
        Err(unsupported())
    }

    fn receive_string(&mut self) -> io::Result<String> {
        Err(unsupported())
    }

    fn receive_doubles(&mut self) -> io::Result<Vec<f64>> {
        Err(unsupported())
    }

    fn receive_ints(&mut self) -> io::Result<Vec<i32>> {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_unsupported() {
        let mut t = NullTransport::new();
        assert_eq!(t.send_int(1).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.send_double(1.0).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.send_bool(true).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.send_string("x").unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.send_doubles(&[1.0]).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.send_ints(&[1]).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_int().unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_double().unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_bool().unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_string().unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_doubles().unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(t.receive_ints().unwrap_err().kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn default_constructs_the_same_as_new() {
        let _ = NullTransport::default();
    }
}
