//! Per-exchange buffers maintained by the scheme (§4.5).
//!
//! The teacher's default-constructible, assertion-trapping map entry (§9
//! Design Notes) has no counterpart here: [`CouplingDataRegistry::get`] and
//! [`CouplingDataRegistry::get_mut`] return `Option`, and nothing in this
//! module ever constructs an empty [`CouplingData`] to satisfy an indexing
//! operator.

use crate::constraint::Constraint;
use crate::error::{Result, UsageError};
use crate::mesh::{DataId, MeshId};
use std::collections::{HashMap, VecDeque};

/// How many columns of iteration/window history `oldValues` retains (§3).
/// Bounded so quasi-Newton acceleration (outside this crate's scope) has a
/// fixed-size window to read without the registry growing without limit.
const DEFAULT_MAX_HISTORY: usize = 8;

/// A single exchanged field's live buffer, staged next-window buffer, and
/// iteration/window history (§3, §4.5).
pub struct CouplingData {
    pub mesh_id: MeshId,
    pub data_id: DataId,
    pub dimension: usize,
    pub constraint: Constraint,
    /// Whether this field must be filled with non-zero initial values before
    /// the first exchange (§3).
    pub initialize: bool,

    values: Vec<f64>,
    new_values: Vec<f64>,
    old_values: VecDeque<Vec<f64>>,
    checkpoint: Option<Vec<f64>>,
    max_history: usize,
}

impl CouplingData {
    pub fn new(
        mesh_id: MeshId,
        data_id: DataId,
        dimension: usize,
        num_vertices: usize,
        initialize: bool,
        constraint: Constraint,
    ) -> Self {
        let len = num_vertices * dimension;
        Self {
            mesh_id,
            data_id,
            dimension,
            constraint,
            initialize,
            values: vec![0.0; len],
            new_values: vec![0.0; len],
            old_values: VecDeque::new(),
            checkpoint: None,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn new_values(&self) -> &[f64] {
        &self.new_values
    }

    pub fn old_values(&self) -> &VecDeque<Vec<f64>> {
        &self.old_values
    }

    /// Writes the solver's values for `local_ids` into `new_values`,
    /// applying the sub-cycling accumulation policy (§4.6): summed for
    /// `Conservative` fields, overwritten for `Consistent` ones. Bounds the
    /// incoming buffer against `local_ids.len() * dimension` (§6).
    pub fn write_block(&mut self, local_ids: &[usize], values: &[f64]) -> Result<()> {
        let expected = local_ids.len() * self.dimension;
        if values.len() != expected {
            return Err(UsageError::BufferLengthMismatch {
                data: format!("{:?}", self.data_id),
                expected,
                actual: values.len(),
                local_ids: local_ids.len(),
                dim: self.dimension,
            }
            .into());
        }
        for (i, &id) in local_ids.iter().enumerate() {
            let src = &values[i * self.dimension..(i + 1) * self.dimension];
            let dst = &mut self.new_values[id * self.dimension..(id + 1) * self.dimension];
            match self.constraint {
                Constraint::Conservative => {
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += s;
                    }
                }
                Constraint::Consistent => dst.copy_from_slice(src),
            }
        }
        Ok(())
    }

    /// Reads the committed `values` for `local_ids` into `out`, bounds-checked
    /// the same way as [`Self::write_block`] (§6).
    pub fn read_block(&self, local_ids: &[usize], out: &mut [f64]) -> Result<()> {
        let expected = local_ids.len() * self.dimension;
        if out.len() != expected {
            return Err(UsageError::BufferLengthMismatch {
                data: format!("{:?}", self.data_id),
                expected,
                actual: out.len(),
                local_ids: local_ids.len(),
                dim: self.dimension,
            }
            .into());
        }
        for (i, &id) in local_ids.iter().enumerate() {
            let src = &self.values[id * self.dimension..(id + 1) * self.dimension];
            out[i * self.dimension..(i + 1) * self.dimension].copy_from_slice(src);
        }
        Ok(())
    }

    /// Direct access to the full `values`/`new_values` buffers for m2n, which
    /// moves the entire local-vertex array rather than a solver-chosen
    /// subset (§4.4).
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn new_values_mut(&mut self) -> &mut [f64] {
        &mut self.new_values
    }

    /// Rotates `new_values` into `values`, pushes the previous `values` as
    /// the newest column of `old_values`, then zeroes `new_values` for the
    /// next window's sub-cycled writes (§4.5).
    pub fn swap(&mut self) {
        let previous = std::mem::replace(&mut self.values, std::mem::take(&mut self.new_values));
        self.old_values.push_front(previous);
        self.old_values.truncate(self.max_history);
        self.new_values = vec![0.0; self.values.len()];
    }

    /// Snapshots `values` for later [`Self::restore`] (§4.5).
    pub fn store(&mut self) {
        self.checkpoint = Some(self.values.clone());
    }

    /// Restores `values` from the last [`Self::store`] snapshot, discarding
    /// whatever was written since (§4.5, used on a non-converged iteration's
    /// rollback).
    pub fn restore(&mut self) {
        if let Some(checkpoint) = &self.checkpoint {
            self.values.copy_from_slice(checkpoint);
        }
    }

    /// Zeroes `new_values` ahead of the next sub-cycled write pass. Called on
    /// a non-converged iteration's rollback so the next iteration's
    /// `Conservative` writes don't double-accumulate on top of the discarded
    /// attempt.
    pub fn reset_new_values(&mut self) {
        self.new_values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Maps `(mesh-id, data-id)` to its [`CouplingData`] record (§4.5).
#[derive(Default)]
pub struct CouplingDataRegistry {
    entries: HashMap<(MeshId, DataId), CouplingData>,
}

impl CouplingDataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data: CouplingData) {
        self.entries.insert((data.mesh_id, data.data_id), data);
    }

    pub fn get(&self, mesh_id: MeshId, data_id: DataId) -> Option<&CouplingData> {
        self.entries.get(&(mesh_id, data_id))
    }

    pub fn get_mut(&mut self, mesh_id: MeshId, data_id: DataId) -> Option<&mut CouplingData> {
        self.entries.get_mut(&(mesh_id, data_id))
    }

    pub fn require(&self, mesh_id: MeshId, data_id: DataId) -> Result<&CouplingData> {
        self.get(mesh_id, data_id).ok_or_else(|| UsageError::UnknownData(data_id).into())
    }

    pub fn require_mut(&mut self, mesh_id: MeshId, data_id: DataId) -> Result<&mut CouplingData> {
        self.get_mut(mesh_id, data_id).ok_or_else(|| UsageError::UnknownData(data_id).into())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CouplingData> {
        self.entries.values_mut()
    }

    pub fn swap_all(&mut self) {
        for data in self.entries.values_mut() {
            data.swap();
        }
    }

    pub fn store_all(&mut self) {
        for data in self.entries.values_mut() {
            data.store();
        }
    }

    pub fn restore_all(&mut self) {
        for data in self.entries.values_mut() {
            data.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_block_sums_for_conservative_constraint() {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 1, 2, false, Constraint::Conservative);
        data.write_block(&[0, 1], &[1.0, 2.0]).unwrap();
        data.write_block(&[0], &[0.5]).unwrap();
        assert_eq!(data.new_values(), &[1.5, 2.0]);
    }

    #[test]
    fn write_block_overwrites_for_consistent_constraint() {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 1, 2, false, Constraint::Consistent);
        data.write_block(&[0, 1], &[1.0, 2.0]).unwrap();
        data.write_block(&[0], &[9.0]).unwrap();
        assert_eq!(data.new_values(), &[9.0, 2.0]);
    }

    #[test]
    fn write_block_rejects_mismatched_buffer_length() {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 2, 2, false, Constraint::Consistent);
        let err = data.write_block(&[0], &[1.0]).unwrap_err();
        assert!(matches!(err, crate::error::CouplingError::Usage(_)));
    }

    #[test]
    fn swap_moves_new_values_into_values_and_records_history() {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 1, 2, false, Constraint::Consistent);
        data.write_block(&[0, 1], &[1.0, 2.0]).unwrap();
        data.swap();
        assert_eq!(data.values(), &[1.0, 2.0]);
        assert_eq!(data.old_values().front().unwrap(), &[0.0, 0.0]);

        data.write_block(&[0, 1], &[3.0, 4.0]).unwrap();
        data.swap();
        assert_eq!(data.values(), &[3.0, 4.0]);
        assert_eq!(data.old_values().front().unwrap(), &[1.0, 2.0]);
        assert_eq!(data.old_values().len(), 2);
    }

    #[test]
    fn store_then_restore_undoes_writes_committed_since() {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 1, 2, false, Constraint::Consistent);
        data.write_block(&[0, 1], &[1.0, 2.0]).unwrap();
        data.swap();
        data.store();

        data.write_block(&[0, 1], &[9.0, 9.0]).unwrap();
        data.swap();
        assert_eq!(data.values(), &[9.0, 9.0]);

        data.restore();
        assert_eq!(data.values(), &[1.0, 2.0]);
    }

    #[test]
    fn registry_lookup_on_unregistered_field_is_none_not_a_panic() {
        let registry = CouplingDataRegistry::new();
        assert!(registry.get(MeshId(0), DataId(0)).is_none());
        assert!(registry.require(MeshId(0), DataId(0)).is_err());
    }
}
