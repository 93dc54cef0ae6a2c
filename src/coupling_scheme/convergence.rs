//! Convergence measures evaluated once per implicit iteration (§4.6).
//!
//! Every measure compares the just-exchanged candidate (`CouplingData::new_values`)
//! against the window's previously committed values (`CouplingData::values`,
//! which `swap` only rotates forward at commit time — so during the
//! iteration loop it still holds last window's final value). Measures
//! combine by conjunction: a window is converged only when every configured
//! measure passes.

use crate::coupling_data::CouplingData;
use crate::mesh::{DataId, MeshId};

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// One configured convergence criterion (§4.6).
#[derive(Debug, Clone)]
pub enum ConvergenceMeasure {
    /// `||new - old||_2 < limit`.
    Absolute { mesh_id: MeshId, data_id: DataId, limit: f64 },
    /// `||new - old||_2 / ||new||_2 < limit`.
    Relative { mesh_id: MeshId, data_id: DataId, limit: f64 },
    /// `||new - old||_2 / ||residual_0||_2 < limit`, where `residual_0` is
    /// this window's first-iteration residual.
    ResidualRelative { mesh_id: MeshId, data_id: DataId, limit: f64 },
    /// Passes only once `iteration >= count`; a floor, not a fitness test —
    /// used in conjunction with another measure to force extra iterations.
    MinIterations { count: u32 },
}

/// Per-window mutable state a [`ConvergenceMeasure`] needs across iterations
/// (currently only `ResidualRelative`'s first-iteration reference norm).
#[derive(Default)]
pub struct MeasureState {
    first_residual_norm: Option<f64>,
}

impl ConvergenceMeasure {
    /// Clears any per-window state. Called when a new time window starts.
    pub fn reset(state: &mut MeasureState) {
        state.first_residual_norm = None;
    }

    /// Evaluates this measure. `data` is the registered [`CouplingData`] it
    /// names — `None` if the registry lookup failed, treated conservatively
    /// as not-yet-converged. `iteration` is the 1-based iteration count
    /// within the current window. `MinIterations` ignores `data` entirely.
    pub fn is_satisfied(&self, data: Option<&CouplingData>, iteration: u32, state: &mut MeasureState) -> bool {
        if let ConvergenceMeasure::MinIterations { count } = self {
            return iteration >= *count;
        }
        let Some(data) = data else {
            return false;
        };
        match self {
            ConvergenceMeasure::Absolute { limit, .. } => {
                l2_distance(data.new_values(), data.values()) < *limit
            }
            ConvergenceMeasure::Relative { limit, .. } => {
                let denom = l2_norm(data.new_values());
                if denom == 0.0 {
                    return true;
                }
                l2_distance(data.new_values(), data.values()) / denom < *limit
            }
            ConvergenceMeasure::ResidualRelative { limit, .. } => {
                let residual = l2_distance(data.new_values(), data.values());
                let reference = *state.first_residual_norm.get_or_insert(residual.max(f64::MIN_POSITIVE));
                residual / reference < *limit
            }
            ConvergenceMeasure::MinIterations { .. } => unreachable!(),
        }
    }

    pub fn mesh_id(&self) -> Option<MeshId> {
        match self {
            ConvergenceMeasure::Absolute { mesh_id, .. }
            | ConvergenceMeasure::Relative { mesh_id, .. }
            | ConvergenceMeasure::ResidualRelative { mesh_id, .. } => Some(*mesh_id),
            ConvergenceMeasure::MinIterations { .. } => None,
        }
    }

    pub fn data_id(&self) -> Option<DataId> {
        match self {
            ConvergenceMeasure::Absolute { data_id, .. }
            | ConvergenceMeasure::Relative { data_id, .. }
            | ConvergenceMeasure::ResidualRelative { data_id, .. } => Some(*data_id),
            ConvergenceMeasure::MinIterations { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;

    fn field(values: &[f64], new_values: &[f64]) -> CouplingData {
        let mut data = CouplingData::new(MeshId(0), DataId(0), 1, values.len(), false, Constraint::Consistent);
        data.write_block(&(0..values.len()).collect::<Vec<_>>(), values).unwrap();
        data.swap();
        data.write_block(&(0..new_values.len()).collect::<Vec<_>>(), new_values).unwrap();
        data
    }

    #[test]
    fn absolute_measure_passes_once_within_limit() {
        let measure = ConvergenceMeasure::Absolute {
            mesh_id: MeshId(0),
            data_id: DataId(0),
            limit: 0.1,
        };
        let mut state = MeasureState::default();
        let data = field(&[1.0], &[1.05]);
        assert!(measure.is_satisfied(Some(&data), 2, &mut state));

        let data = field(&[1.0], &[2.0]);
        assert!(!measure.is_satisfied(Some(&data), 2, &mut state));
    }

    #[test]
    fn min_iterations_measure_rejects_until_count_reached() {
        let measure = ConvergenceMeasure::MinIterations { count: 3 };
        let mut state = MeasureState::default();
        assert!(!measure.is_satisfied(None, 2, &mut state));
        assert!(measure.is_satisfied(None, 3, &mut state));
    }
}
