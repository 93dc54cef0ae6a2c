//! `PointToPoint`: each sender rank holds a direct [`Transport`] channel to
//! every receiver rank its [`crate::partition::FeedbackMap`] entry names; no
//! master bottleneck (§4.4).
//!
//! A vertex can arrive more than once in one `receive` call — from distinct
//! sender ranks whose geometric support overlaps it. The first arrival for a
//! vertex in a call initializes its slot; later arrivals accumulate
//! (`Conservative`) or overwrite (`Consistent`). Sender channels are drained
//! in ascending rank order, so for `Consistent` data the highest-ranked
//! sender's value wins — the deterministic tie-break §4.4 calls for.

use super::DistributedCommunication;
use crate::constraint::Constraint;
use crate::error::{CouplingError, Result};
use crate::intracomm::IntraComm;
use crate::transport::Transport;
use std::collections::{HashMap, HashSet};

pub struct PointToPoint<I: IntraComm> {
    intracomm: I,
    /// Channels to receiver ranks on the peer participant that need data
    /// from this rank (this rank's `FeedbackMap` entry).
    send_channels: HashMap<usize, Box<dyn Transport>>,
    /// Channels to peer-participant sender ranks this rank receives from.
    recv_channels: HashMap<usize, Box<dyn Transport>>,
    /// This rank's local vertices' global indices, in local-index order.
    local_global_indices: Vec<usize>,
    /// This rank's owned local vertex indices (only owned vertices are put
    /// on the wire when sending).
    owned_local_indices: Vec<usize>,
    /// global index -> local index, for resequencing arrivals on receive.
    global_to_local: HashMap<usize, usize>,
    /// One control channel, master-to-master, for the convergence bit;
    /// `None` on secondary ranks.
    control_link: Option<Box<dyn Transport>>,
    participant_name: String,
}

impl<I: IntraComm> PointToPoint<I> {
    pub fn new(
        intracomm: I,
        send_channels: HashMap<usize, Box<dyn Transport>>,
        recv_channels: HashMap<usize, Box<dyn Transport>>,
        local_global_indices: Vec<usize>,
        owned_local_indices: Vec<usize>,
        control_link: Option<Box<dyn Transport>>,
        participant_name: impl Into<String>,
    ) -> Self {
        let global_to_local = local_global_indices
            .iter()
            .enumerate()
            .map(|(local, &global)| (global, local))
            .collect();
        Self {
            intracomm,
            send_channels,
            recv_channels,
            local_global_indices,
            owned_local_indices,
            global_to_local,
            control_link,
            participant_name: participant_name.into(),
        }
    }

    fn transport_err(&self, source: std::io::Error) -> CouplingError {
        CouplingError::transport(self.intracomm.rank(), self.participant_name.clone(), source)
    }
}

impl<I: IntraComm> DistributedCommunication for PointToPoint<I> {
    fn send(&mut self, values: &[f64], dim: usize, _constraint: Constraint) -> Result<()> {
        let owned: Vec<(usize, &[f64])> = self
            .owned_local_indices
            .iter()
            .map(|&local| (self.local_global_indices[local], &values[local * dim..(local + 1) * dim]))
            .collect();

        let mut receivers: Vec<usize> = self.send_channels.keys().copied().collect();
        receivers.sort_unstable();
        for receiver in receivers {
            let channel = self.send_channels.get_mut(&receiver).unwrap();
            channel
                .send_int(owned.len() as i32)
                .map_err(|e| self.transport_err(e))?;
            for (global_index, slice) in &owned {
                channel
                    .send_int(*global_index as i32)
                    .map_err(|e| self.transport_err(e))?;
                channel.send_doubles(slice).map_err(|e| self.transport_err(e))?;
            }
        }
        Ok(())
    }

    fn receive(&mut self, values: &mut [f64], dim: usize, constraint: Constraint) -> Result<()> {
        let mut senders: Vec<usize> = self.recv_channels.keys().copied().collect();
        senders.sort_unstable();

        let mut touched: HashSet<usize> = HashSet::new();
        for sender in senders {
            let channel = self.recv_channels.get_mut(&sender).unwrap();
            let count = channel.receive_int().map_err(|e| self.transport_err(e))? as usize;
            for _ in 0..count {
                let global_index = channel.receive_int().map_err(|e| self.transport_err(e))? as usize;
                let incoming = channel.receive_doubles().map_err(|e| self.transport_err(e))?;

                let Some(&local_index) = self.global_to_local.get(&global_index) else {
                    continue;
                };
                let slot = &mut values[local_index * dim..(local_index + 1) * dim];
                if touched.insert(local_index) {
                    slot.copy_from_slice(&incoming);
                } else {
                    match constraint {
                        Constraint::Conservative => {
                            for (s, v) in slot.iter_mut().zip(incoming.iter()) {
                                *s += v;
                            }
                        }
                        Constraint::Consistent => slot.copy_from_slice(&incoming),
                    }
                }
            }
        }
        Ok(())
    }

    fn send_bool(&mut self, value: bool) -> Result<()> {
        if let Some(control) = &mut self.control_link {
            control.send_bool(value).map_err(|e| self.transport_err(e))?;
        }
        Ok(())
    }

    fn receive_bool(&mut self) -> Result<bool> {
        let rank = self.intracomm.rank();
        let verdict = if let Some(control) = &mut self.control_link {
            control.receive_bool().map_err(|e| self.transport_err(e))?
        } else {
            false
        };
        self.intracomm
            .broadcast_bool(verdict)
            .map_err(|e| CouplingError::transport(rank, self.participant_name.clone(), e))
    }
}
