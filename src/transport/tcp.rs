//! Transport backed by a plain TCP socket.
//!
//! Unlike the teacher's `ConnectionPool` (which fans a rank's traffic out to
//! many peers over background threads), a `Transport` here is scoped to a
//! single peer: §5 rules out internal threads, so connection establishment
//! and I/O both happen synchronously on the caller's thread.

use super::wire;
use super::Transport;
use std::io;
use std::net::{TcpListener, TcpStream};

/// A TCP-backed [`Transport`] to exactly one peer.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// The received-side role: accept the next incoming connection on
    /// `listener`. Corresponds to `acceptConnection(self, peer)` in §4.1.
    pub fn accept_connection(listener: &TcpListener) -> io::Result<Self> {
        let (stream, _addr) = listener.accept()?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// The provided-side role: open a connection to `peer`. Corresponds to
    /// `requestConnection(peer, self)` in §4.1.
    pub fn request_connection(peer: std::net::SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(peer)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn send_int(&mut self, value: i32) -> io::Result<()> {
        wire::write_i32(&mut self.stream, value)
    }

    fn send_double(&mut self, value: f64) -> io::Result<()> {
        wire::write_f64(&mut self.stream, value)
    }

    fn send_bool(&mut self, value: bool) -> io::Result<()> {
        wire::write_bool(&mut self.stream, value)
    }

    fn send_string(&mut self, value: &str) -> io::Result<()> {
        wire::write_string(&mut self.stream, value)
    }

    fn send_doubles(&mut self, values: &[f64]) -> io::Result<()> {
        wire::write_doubles(&mut self.stream, values)
    }

    fn send_ints(&mut self, values: &[i32]) -> io::Result<()> {
        wire::write_ints(&mut self.stream, values)
    }

    fn receive_int(&mut self) -> io::Result<i32> {
        wire::read_i32(&mut self.stream)
    }

    fn receive_double(&mut self) -> io::Result<f64> {
        wire::read_f64(&mut self.stream)
    }

    fn receive_bool(&mut self) -> io::Result<bool> {
        wire::read_bool(&mut self.stream)
    }

    fn receive_string(&mut self) -> io::Result<String> {
        wire::read_string(&mut self.stream)
    }

    fn receive_doubles(&mut self) -> io::Result<Vec<f64>> {
        wire::read_doubles(&mut self.stream)
    }

    fn receive_ints(&mut self) -> io::Result<Vec<i32>> {
        wire::read_ints(&mut self.stream)
    }
}
