//! The thin solver-facing orchestrator (§6).
//!
//! `CouplingInterface` is the only part of this crate a solver integration
//! calls directly. It owns none of the solver's numerics — it wires the
//! already-configured [`CouplingScheme`] to the handful of calls real solver
//! adapters make: initialize/advance/finalize, block-wise read/write, and
//! the action-tag checkpoint handshake for implicit iteration.

pub use crate::coupling_scheme::{ACTION_READ_ITERATION_CHECKPOINT, ACTION_WRITE_ITERATION_CHECKPOINT};

use crate::coupling_scheme::CouplingScheme;
use crate::error::Result;
use crate::m2n::DistributedCommunication;
use crate::mesh::{DataId, MeshId};
use tracing::instrument;

pub struct CouplingInterface<M: DistributedCommunication> {
    scheme: CouplingScheme<M>,
}

impl<M: DistributedCommunication> CouplingInterface<M> {
    pub fn new(scheme: CouplingScheme<M>) -> Self {
        Self { scheme }
    }

    #[instrument(skip(self))]
    pub fn initialize(&mut self) -> Result<f64> {
        self.scheme.initialize()
    }

    #[instrument(skip(self))]
    pub fn advance(&mut self, computed_dt: f64) -> Result<f64> {
        self.scheme.advance(computed_dt)
    }

    pub fn finalize(&mut self) {
        self.scheme.finalize();
    }

    /// Writes the solver's values for `local_ids` into the named field,
    /// bounds-checked against `local_ids.len() * dimension` (§6).
    pub fn write_block_vector_data(
        &mut self,
        mesh_id: MeshId,
        data_id: DataId,
        local_ids: &[usize],
        values: &[f64],
    ) -> Result<()> {
        self.scheme
            .data_registry_mut()
            .require_mut(mesh_id, data_id)?
            .write_block(local_ids, values)
    }

    /// Reads the coupling's current committed values for `local_ids` into
    /// `out`, bounds-checked the same way as [`Self::write_block_vector_data`].
    pub fn read_block_vector_data(
        &self,
        mesh_id: MeshId,
        data_id: DataId,
        local_ids: &[usize],
        out: &mut [f64],
    ) -> Result<()> {
        self.scheme.data_registry().require(mesh_id, data_id)?.read_block(local_ids, out)
    }

    pub fn is_coupling_ongoing(&self) -> bool {
        self.scheme.is_coupling_ongoing()
    }

    pub fn is_time_window_complete(&self) -> bool {
        self.scheme.is_time_window_complete()
    }

    pub fn is_action_required(&self, tag: &str) -> bool {
        self.scheme.is_action_required(tag)
    }

    pub fn mark_action_fulfilled(&mut self, tag: &str) -> Result<()> {
        self.scheme.mark_action_fulfilled(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::coupling_data::CouplingData;
    use crate::coupling_scheme::{Direction, ExchangeSpec, Role, SchemeKind};
    use crate::intracomm::SingleRankIntraComm;
    use crate::m2n::GatherScatter;
    use crate::transport::ChannelTransport;

    #[test]
    fn explicit_round_trip_through_the_interface() {
        let (a_link, b_link) = ChannelTransport::pair();
        let m2n_first = GatherScatter::new(SingleRankIntraComm, Some(Box::new(b_link)), vec![0], vec![0, 1], "second");
        let m2n_second = GatherScatter::new(SingleRankIntraComm, Some(Box::new(a_link)), vec![0], vec![0, 1], "first");

        let mut first = CouplingScheme::new(
            Role::First,
            SchemeKind::SerialExplicit,
            1.0,
            1,
            None,
            None,
            vec![ExchangeSpec {
                mesh_id: MeshId(0),
                data_id: DataId(0),
                direction: Direction::Send,
            }],
            vec![],
            m2n_first,
        );
        first.register_data(CouplingData::new(MeshId(0), DataId(0), 1, 1, false, Constraint::Consistent));
        let mut first = CouplingInterface::new(first);

        let mut second = CouplingScheme::new(
            Role::Second,
            SchemeKind::SerialExplicit,
            1.0,
            1,
            None,
            None,
            vec![ExchangeSpec {
                mesh_id: MeshId(0),
                data_id: DataId(0),
                direction: Direction::Receive,
            }],
            vec![],
            m2n_second,
        );
        second.register_data(CouplingData::new(MeshId(0), DataId(0), 1, 1, false, Constraint::Consistent));
        let mut second = CouplingInterface::new(second);

        first.initialize().unwrap();
        second.initialize().unwrap();

        first.write_block_vector_data(MeshId(0), DataId(0), &[0], &[7.0]).unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| first.advance(1.0).unwrap());
            second.advance(1.0).unwrap();
        });

        let mut out = [0.0];
        second.read_block_vector_data(MeshId(0), DataId(0), &[0], &mut out).unwrap();
        assert_eq!(out, [7.0]);
        assert!(!first.is_coupling_ongoing());
    }
}
