//! A minimal point-to-point message-passing API.
//!
//! This module exports the [`Transport`] trait: a bidirectional, reliable,
//! ordered byte channel between exactly two named endpoints. It is
//! deliberately narrow — no multiplexing, no discovery, no RPC framework
//! (§1 Non-goals) — because the coupling protocol only ever needs ordered
//! delivery between one rank and one specific peer rank. [`tcp::TcpTransport`]
//! is the production implementation; [`channel::ChannelTransport`] lets
//! tests exercise the partition/m2n/scheme layers without opening real
//! sockets, and [`null::NullTransport`] is a channel that refuses every
//! call, for slots that require a `Transport` but must never see one used.

mod channel;
mod null;
mod tcp;
mod wire;

pub use channel::ChannelTransport;
pub use null::NullTransport;
pub use tcp::TcpTransport;

use std::io;

/// A reliable, ordered, bidirectional byte channel to one specific peer.
///
/// Every method can block indefinitely (§5): there is no cancellation and no
/// timeout in the contract. Any I/O error is fatal per §4.7 — callers
/// propagate it as a [`crate::error::CouplingError::Transport`] and abort,
/// they do not retry.
pub trait Transport: Send {
    fn send_int(&mut self, value: i32) -> io::Result<()>;
    fn send_double(&mut self, value: f64) -> io::Result<()>;
    fn send_bool(&mut self, value: bool) -> io::Result<()>;
    fn send_string(&mut self, value: &str) -> io::Result<()>;
    fn send_doubles(&mut self, values: &[f64]) -> io::Result<()>;
    fn send_ints(&mut self, values: &[i32]) -> io::Result<()>;

    fn receive_int(&mut self) -> io::Result<i32>;
    fn receive_double(&mut self) -> io::Result<f64>;
    fn receive_bool(&mut self) -> io::Result<bool>;
    fn receive_string(&mut self) -> io::Result<String>;
    fn receive_doubles(&mut self) -> io::Result<Vec<f64>>;
    fn receive_ints(&mut self) -> io::Result<Vec<i32>>;
}
