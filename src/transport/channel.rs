//! An in-process transport for tests.
//!
//! Backed by a pair of `std::sync::mpsc` channels rather than a socket, so
//! partition/m2n/scheme integration tests can run two or more "ranks" as
//! plain threads in one test binary without touching the network. Each call
//! to a `send_*` method is framed into one message using the same encoding
//! [`super::wire`] uses for the TCP transport, then handed to the channel as
//! a single frame; `receive_*` pulls the next frame and decodes it. This
//! keeps the two transports wire-compatible in spirit, even though no actual
//! socket separates them.

use super::wire;
use super::Transport;
use std::io;
use std::sync::mpsc::{Receiver, Sender};

pub struct ChannelTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Creates two endpoints of an in-process channel, connected to each other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = std::sync::mpsc::channel();
        let (tx_b, rx_a) = std::sync::mpsc::channel();
        (
            Self { tx: tx_a, rx: rx_a },
            Self { tx: tx_b, rx: rx_b },
        )
    }

    fn send_frame(&self, frame: Vec<u8>) -> io::Result<()> {
        self.tx
            .send(frame)
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))
    }

    fn recv_frame(&self) -> io::Result<Vec<u8>> {
        self.rx
            .recv()
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))
    }
}

impl Transport for ChannelTransport {
    fn send_int(&mut self, value: i32) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_i32(&mut buf, value)?;
        self.send_frame(buf)
    }

    fn send_double(&mut self, value: f64) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_f64(&mut buf, value)?;
        self.send_frame(buf)
    }

    fn send_bool(&mut self, value: bool) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_bool(&mut buf, value)?;
        self.send_frame(buf)
    }

    fn send_string(&mut self, value: &str) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_string(&mut buf, value)?;
        self.send_frame(buf)
    }

    fn send_doubles(&mut self, values: &[f64]) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_doubles(&mut buf, values)?;
        self.send_frame(buf)
    }

    fn send_ints(&mut self, values: &[i32]) -> io::Result<()> {
        let mut buf = Vec::new();
        wire::write_ints(&mut buf, values)?;
        self.send_frame(buf)
    }

    fn receive_int(&mut self) -> io::Result<i32> {
        let frame = self.recv_frame()?;
        wire::read_i32(&mut &frame[..])
    }

    fn receive_double(&mut self) -> io::Result<f64> {
        let frame = self.recv_frame()?;
        wire::read_f64(&mut &frame[..])
    }

    fn receive_bool(&mut self) -> io::Result<bool> {
        let frame = self.recv_frame()?;
        wire::read_bool(&mut &frame[..])
    }

    fn receive_string(&mut self) -> io::Result<String> {
        let frame = self.recv_frame()?;
        wire::read_string(&mut &frame[..])
    }

    fn receive_doubles(&mut self) -> io::Result<Vec<f64>> {
        let frame = self.recv_frame()?;
        wire::read_doubles(&mut &frame[..])
    }

    fn receive_ints(&mut self) -> io::Result<Vec<i32>> {
        let frame = self.recv_frame()?;
        wire::read_ints(&mut &frame[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_round_trips_values() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.send_doubles(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(b.receive_doubles().unwrap(), vec![1.0, 2.0, 3.0]);

        b.send_string("structure").unwrap();
        assert_eq!(a.receive_string().unwrap(), "structure");
    }
}
