//! `GatherScatter`: secondary ranks relay through their own master via
//! [`IntraComm`], masters relay to each other over a single [`Transport`]
//! link (§4.4). Simple, O(|mesh|) master traffic.
//!
//! Every owned vertex has exactly one owner rank (§4.3 invariant), so unlike
//! [`super::point_to_point::PointToPoint`] this path never sees duplicate
//! arrivals for the same vertex — `constraint` is accepted for trait
//! symmetry but does not change behavior here.

use super::DistributedCommunication;
use crate::constraint::Constraint;
use crate::error::{CouplingError, Result};
use crate::intracomm::IntraComm;
use crate::transport::Transport;

pub struct GatherScatter<I: IntraComm> {
    intracomm: I,
    master_link: Option<Box<dyn Transport>>,
    /// This rank's owned local vertex indices, ascending (the mesh's own
    /// `VertexDistribution[rank]` entry).
    owned_local_indices: Vec<usize>,
    /// This participant's own canonical vertex-offset prefix sums (the
    /// mesh's `vertex_offsets`); used by the master to size the scatter when
    /// receiving.
    vertex_offsets: Vec<usize>,
    participant_name: String,
}

impl<I: IntraComm> GatherScatter<I> {
    /// `master_link` must be `Some` exactly on the rank for which
    /// `intracomm.is_master()` is true.
    pub fn new(
        intracomm: I,
        master_link: Option<Box<dyn Transport>>,
        owned_local_indices: Vec<usize>,
        vertex_offsets: Vec<usize>,
        participant_name: impl Into<String>,
    ) -> Self {
        Self {
            intracomm,
            master_link,
            owned_local_indices,
            vertex_offsets,
            participant_name: participant_name.into(),
        }
    }

    fn transport_err(&self, source: std::io::Error) -> CouplingError {
        CouplingError::transport(self.intracomm.rank(), self.participant_name.clone(), source)
    }
}

impl<I: IntraComm> DistributedCommunication for GatherScatter<I> {
    fn send(&mut self, values: &[f64], dim: usize, _constraint: Constraint) -> Result<()> {
        let mut owned_slice = Vec::with_capacity(self.owned_local_indices.len() * dim);
        for &local_index in &self.owned_local_indices {
            owned_slice.extend_from_slice(&values[local_index * dim..(local_index + 1) * dim]);
        }

        let rank = self.intracomm.rank();
        let gathered = self
            .intracomm
            .gather_doubles(&owned_slice)
            .map_err(|e| CouplingError::transport(rank, self.participant_name.clone(), e))?;

        if let Some(master_link) = &mut self.master_link {
            master_link.send_doubles(&gathered).map_err(|e| self.transport_err(e))?;
        }
        Ok(())
    }

    fn receive(&mut self, values: &mut [f64], dim: usize, _constraint: Constraint) -> Result<()> {
        let flat = if let Some(master_link) = &mut self.master_link {
            master_link.receive_doubles().map_err(|e| self.transport_err(e))?
        } else {
            Vec::new()
        };

        let sizes: Vec<usize> = self
            .vertex_offsets
            .windows(2)
            .map(|w| (w[1] - w[0]) * dim)
            .collect();
        let is_master = self.master_link.is_some();
        let rank = self.intracomm.rank();
        let own_slice = self
            .intracomm
            .scatter_doubles(is_master.then(|| (&flat[..], &sizes[..])))
            .map_err(|e| CouplingError::transport(rank, self.participant_name.clone(), e))?;

        for (k, &local_index) in self.owned_local_indices.iter().enumerate() {
            values[local_index * dim..(local_index + 1) * dim]
                .copy_from_slice(&own_slice[k * dim..(k + 1) * dim]);
        }
        Ok(())
    }

    fn send_bool(&mut self, value: bool) -> Result<()> {
        if let Some(master_link) = &mut self.master_link {
            master_link.send_bool(value).map_err(|e| self.transport_err(e))?;
        }
        Ok(())
    }

    fn receive_bool(&mut self) -> Result<bool> {
        let rank = self.intracomm.rank();
        let verdict = if let Some(master_link) = &mut self.master_link {
            master_link.receive_bool().map_err(|e| self.transport_err(e))?
        } else {
            false
        };
        self.intracomm
            .broadcast_bool(verdict)
            .map_err(|e| CouplingError::transport(rank, self.participant_name.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intracomm::SingleRankIntraComm;
    use crate::transport::ChannelTransport;

    #[test]
    fn single_rank_round_trip_preserves_values() {
        let (a_link, b_link) = ChannelTransport::pair();
        let mut a = GatherScatter::new(
            SingleRankIntraComm,
            Some(Box::new(a_link)),
            vec![0, 1],
            vec![0, 2],
            "fluid",
        );
        let mut b = GatherScatter::new(
            SingleRankIntraComm,
            Some(Box::new(b_link)),
            vec![0, 1],
            vec![0, 2],
            "structure",
        );

        std::thread::scope(|scope| {
            scope.spawn(move || {
                a.send(&[1.0, 2.0, 3.0, 4.0], 2, Constraint::Consistent).unwrap();
            });
            let mut received = vec![0.0; 4];
            b.receive(&mut received, 2, Constraint::Consistent).unwrap();
            assert_eq!(received, vec![1.0, 2.0, 3.0, 4.0]);
        });
    }

    #[test]
    fn convergence_bit_round_trips() {
        let (a_link, b_link) = ChannelTransport::pair();
        let mut a = GatherScatter::new(SingleRankIntraComm, Some(Box::new(a_link)), vec![], vec![0], "second");
        let mut b = GatherScatter::new(SingleRankIntraComm, Some(Box::new(b_link)), vec![], vec![0], "first");

        std::thread::scope(|scope| {
            scope.spawn(move || {
                a.send_bool(true).unwrap();
            });
            assert!(b.receive_bool().unwrap());
        });
    }
}
