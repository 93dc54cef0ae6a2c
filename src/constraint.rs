//! The accumulation policy attached to an exchanged [`crate::mesh::Data`]
//! field (§4.4, §6).
//!
//! `Consistent` data is pointwise: a vertex's value is whatever the last
//! relevant sender wrote. `Conservative` data is integral-preserving:
//! contributions from multiple senders to the same vertex are summed. The
//! tag travels with the exchange configuration, not with the data itself,
//! since the same field could in principle be mapped both ways in different
//! couplings.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Constraint {
    Consistent,
    Conservative,
}
