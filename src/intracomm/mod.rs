//! Collective operations over the ranks of one participant (§4.2).
//!
//! Rank 0 is always the group's master. Every collective implicitly
//! synchronizes: callers must guarantee all ranks in the group call the
//! same collective, in the same order — exactly as the teacher's
//! `Communicator` trait doc describes broadcast/reduce/gather being built
//! from a minimal `send`/`recv` primitive, except here the group topology
//! (master talks directly to every secondary) is explicit rather than
//! delegated to an external MPI runtime.

use crate::transport::Transport;
use std::io;

/// The collectives the partition and m2n layers need. Only operates on
/// `f64` slices and `bool`s because those are the only payloads exchanged
/// within a group (coordinate/data arrays, convergence verdict bits) — this
/// is not meant to be a general MPI replacement (§1 Non-goals).
pub trait IntraComm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn is_master(&self) -> bool {
        self.rank() == 0
    }

    /// Master broadcasts `value`; every rank (including master) returns it.
    fn broadcast_bool(&mut self, value: bool) -> io::Result<bool>;

    /// Master broadcasts `values`; every rank (including master) returns them.
    fn broadcast_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>>;

    /// Every rank contributes `values`; only the master's return value is a
    /// concatenation in rank order (master's own slice first). Secondary
    /// ranks get an empty vector back — they have nothing to do with a
    /// gather's result, per §4.2.
    fn gather_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>>;

    /// Master calls with `Some((values, sizes))`, where `sizes[i]` is the
    /// number of elements destined for rank `i` and `values` is their
    /// concatenation in rank order; every other rank calls with `None`.
    /// Every rank (including master) gets back its own slice.
    fn scatter_doubles(&mut self, from_master: Option<(&[f64], &[usize])>) -> io::Result<Vec<f64>>;

    /// Every rank contributes `value`; the master's return is `Some(sum)`,
    /// every other rank's is `None`.
    fn reduce_sum(&mut self, value: f64) -> io::Result<Option<f64>>;
}

enum Role {
    Master { secondaries: Vec<Box<dyn Transport>> },
    Secondary { master: Box<dyn Transport> },
}

/// An [`IntraComm`] built directly on [`Transport`] channels: the master
/// holds one channel per secondary rank, each secondary holds one channel
/// back to the master. There is no peer-to-peer traffic between secondaries
/// — every collective routes through the master, matching §4.2's "used by
/// the partition and m2n layers for master-only transport arrangements".
pub struct TransportIntraComm {
    rank: usize,
    size: usize,
    role: Role,
}

impl TransportIntraComm {
    pub fn new_master(size: usize, secondaries: Vec<Box<dyn Transport>>) -> Self {
        assert_eq!(secondaries.len(), size.saturating_sub(1));
        Self {
            rank: 0,
            size,
            role: Role::Master { secondaries },
        }
    }

    pub fn new_secondary(rank: usize, size: usize, master: Box<dyn Transport>) -> Self {
        assert!(rank > 0 && rank < size);
        Self {
            rank,
            size,
            role: Role::Secondary { master },
        }
    }
}

impl IntraComm for TransportIntraComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_bool(&mut self, value: bool) -> io::Result<bool> {
        match &mut self.role {
            Role::Master { secondaries } => {
                for channel in secondaries.iter_mut() {
                    channel.send_bool(value)?;
                }
                Ok(value)
            }
            Role::Secondary { master } => master.receive_bool(),
        }
    }

    fn broadcast_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>> {
        match &mut self.role {
            Role::Master { secondaries } => {
                for channel in secondaries.iter_mut() {
                    channel.send_doubles(values)?;
                }
                Ok(values.to_vec())
            }
            Role::Secondary { master } => master.receive_doubles(),
        }
    }

    fn gather_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>> {
        match &mut self.role {
            Role::Master { secondaries } => {
                let mut all = values.to_vec();
                for channel in secondaries.iter_mut() {
                    all.extend(channel.receive_doubles()?);
                }
                Ok(all)
            }
            Role::Secondary { master } => {
                master.send_doubles(values)?;
                Ok(Vec::new())
            }
        }
    }

    fn scatter_doubles(&mut self, from_master: Option<(&[f64], &[usize])>) -> io::Result<Vec<f64>> {
        match &mut self.role {
            Role::Master { secondaries } => {
                let (values, sizes) = from_master.expect("master must supply values to scatter");
                assert_eq!(sizes.len(), secondaries.len() + 1);
                let mut cursor = sizes[0];
                let own = values[..cursor].to_vec();
                for (channel, &size) in secondaries.iter_mut().zip(&sizes[1..]) {
                    channel.send_doubles(&values[cursor..cursor + size])?;
                    cursor += size;
                }
                Ok(own)
            }
            Role::Secondary { master } => master.receive_doubles(),
        }
    }

    fn reduce_sum(&mut self, value: f64) -> io::Result<Option<f64>> {
        match &mut self.role {
            Role::Master { secondaries } => {
                let mut total = value;
                for channel in secondaries.iter_mut() {
                    total += channel.receive_double()?;
                }
                Ok(Some(total))
            }
            Role::Secondary { master } => {
                master.send_double(value)?;
                Ok(None)
            }
        }
    }
}

/// A single-rank group: every collective is the identity. Used by
/// participants that run on exactly one rank, and by tests that exercise
/// the partition/m2n layers without standing up a real group.
pub struct SingleRankIntraComm;

impl IntraComm for SingleRankIntraComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_bool(&mut self, value: bool) -> io::Result<bool> {
        Ok(value)
    }

    fn broadcast_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>> {
        Ok(values.to_vec())
    }

    fn gather_doubles(&mut self, values: &[f64]) -> io::Result<Vec<f64>> {
        Ok(values.to_vec())
    }

    fn scatter_doubles(&mut self, from_master: Option<(&[f64], &[usize])>) -> io::Result<Vec<f64>> {
        Ok(from_master.map(|(values, _)| values.to_vec()).unwrap_or_default())
    }

    fn reduce_sum(&mut self, value: f64) -> io::Result<Option<f64>> {
        Ok(Some(value))
    }
}
