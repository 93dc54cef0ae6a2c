//! Typed configuration records consumed from an external parser, and
//! validation of them (§3.1, §4.8).
//!
//! This crate does not parse XML or any other configuration language — it
//! accepts records already shaped like these (`Deserialize`), and
//! [`validate`] is the one operation it performs on them: reject anything an
//! external parser could not itself have caught (dangling references,
//! structurally impossible schemes), and `tracing::warn!` on softer
//! guideline violations.

use crate::constraint::Constraint;
use crate::coupling_scheme::SchemeKind;
use crate::error::ConfigError;
use crate::partition::GeometricFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshRef {
    pub mesh: String,
    /// Whether this participant owns (provides) the mesh, vs. receiving a
    /// read-only filtered copy of a peer's (§3 Lifecycle).
    pub provide: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub meshes: Vec<MeshRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub name: String,
    pub dimension: usize,
    pub geometric_filter: GeometricFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub name: String,
    pub dimension: usize,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Tcp,
    InProcess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M2NConfig {
    pub kind: TransportKind,
    pub first_participant: String,
    pub second_participant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub data: String,
    pub mesh: String,
    pub from: String,
    pub to: String,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConvergenceMeasureConfig {
    Absolute { data: String, mesh: String, limit: f64 },
    Relative { data: String, mesh: String, limit: f64 },
    ResidualRelative { data: String, mesh: String, limit: f64 },
    MinIterations { count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingSchemeConfig {
    pub kind: SchemeKind,
    pub participants: (String, String),
    pub max_windows: u64,
    pub time_window_size: f64,
    pub max_iterations: Option<u32>,
    pub exchanges: Vec<ExchangeConfig>,
    pub convergence_measures: Vec<ConvergenceMeasureConfig>,
}

/// The full set of typed records an external parser hands to this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub participants: Vec<Participant>,
    pub meshes: Vec<MeshConfig>,
    pub data: Vec<DataConfig>,
    pub m2n_links: Vec<M2NConfig>,
    pub coupling_schemes: Vec<CouplingSchemeConfig>,
}

fn is_implicit(kind: SchemeKind) -> bool {
    matches!(kind, SchemeKind::SerialImplicit | SchemeKind::ParallelImplicit)
}

/// Checks a [`RunConfig`] for the inconsistencies an external parser cannot
/// itself catch: dangling participant/mesh/data references, degenerate
/// exchanges and m2n links, and implicit schemes missing `max_iterations`
/// (§4.8). Returns the first violation found.
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    let participant_names: HashSet<&str> = config.participants.iter().map(|p| p.name.as_str()).collect();
    let mesh_names: HashSet<&str> = config.meshes.iter().map(|m| m.name.as_str()).collect();
    let data_names: HashSet<&str> = config.data.iter().map(|d| d.name.as_str()).collect();

    let require_participant = |name: &str| -> Result<(), ConfigError> {
        if participant_names.contains(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownParticipant(name.to_string()))
        }
    };

    for link in &config.m2n_links {
        require_participant(&link.first_participant)?;
        require_participant(&link.second_participant)?;
        if link.first_participant == link.second_participant {
            return Err(ConfigError::DegenerateM2N {
                first: link.first_participant.clone(),
                second: link.second_participant.clone(),
            });
        }
    }

    for scheme in &config.coupling_schemes {
        require_participant(&scheme.participants.0)?;
        require_participant(&scheme.participants.1)?;

        if is_implicit(scheme.kind) && scheme.max_iterations.is_none() {
            return Err(ConfigError::MissingMaxIterations {
                scheme: format!("{:?}", scheme.kind),
            });
        }

        for exchange in &scheme.exchanges {
            if !mesh_names.contains(exchange.mesh.as_str()) {
                return Err(ConfigError::UnknownMesh(exchange.mesh.clone()));
            }
            if !data_names.contains(exchange.data.as_str()) {
                return Err(ConfigError::UnknownData(exchange.data.clone()));
            }
            require_participant(&exchange.from)?;
            require_participant(&exchange.to)?;
            if exchange.from == exchange.to {
                return Err(ConfigError::DegenerateExchange {
                    data: exchange.data.clone(),
                    mesh: exchange.mesh.clone(),
                    participant: exchange.from.clone(),
                });
            }
        }
    }

    for mesh in &config.meshes {
        if mesh.geometric_filter == GeometricFilter::NoFilter {
            let used_in_exchange = config
                .coupling_schemes
                .iter()
                .flat_map(|s| &s.exchanges)
                .any(|ex| ex.mesh == mesh.name);
            if used_in_exchange {
                tracing::warn!(
                    mesh = mesh.name.as_str(),
                    "mesh uses NO_FILTER; confirm a global mapping actually needs the unfiltered mesh"
                );
            }
        }
    }

    Ok(())
}
