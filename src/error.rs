//! Crate-wide error taxonomy.
//!
//! Every fatal error variant carries enough context (participant name, rank,
//! offending parameter) to produce a precise diagnostic at the point it is
//! logged, per the propagation policy: fatal errors abort the run, non-fatal
//! ones (`NumericWarning`) are logged through [`crate::logging`] and do not
//! appear here at all.

use thiserror::Error;

/// Invalid or inconsistent configuration, detected at load time. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("mesh '{0}' referenced by an exchange is not declared")]
    UnknownMesh(String),

    #[error("data '{0}' referenced by an exchange is not declared")]
    UnknownData(String),

    #[error("participant '{0}' referenced by a coupling-scheme or m2n block is not declared")]
    UnknownParticipant(String),

    #[error("exchange for data '{data}' on mesh '{mesh}' has identical from/to participant '{participant}'")]
    DegenerateExchange {
        data: String,
        mesh: String,
        participant: String,
    },

    #[error("coupling scheme '{scheme:?}' is implicit but does not declare max-iterations")]
    MissingMaxIterations { scheme: String },

    #[error("m2n link between '{first}' and '{second}' does not name two distinct participants")]
    DegenerateM2N { first: String, second: String },
}

/// Participants disagree on an expected message. Fatal: indicates version or
/// configuration skew between the two sides of a coupling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("participant '{participant}' expected mesh dimension {expected}, peer sent {actual}")]
    DimensionMismatch {
        participant: String,
        expected: usize,
        actual: usize,
    },

    #[error("participant '{participant}' rank {rank}: expected mesh '{expected}', peer sent identity {actual}")]
    MeshIdentityMismatch {
        participant: String,
        rank: usize,
        expected: String,
        actual: i32,
    },

    #[error("participant '{participant}' rank {rank}: received {received} values for data '{data}', expected {expected}")]
    DataLengthMismatch {
        participant: String,
        rank: usize,
        data: String,
        expected: usize,
        received: usize,
    },
}

/// The solver violated the API contract, e.g. an unknown data id or a
/// mismatched buffer length. Fatal, with a precise diagnostic.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("no data registered with id {0:?}")]
    UnknownData(crate::mesh::DataId),

    #[error("no mesh registered with id {0:?}")]
    UnknownMesh(crate::mesh::MeshId),

    #[error("write_block_vector_data for '{data}': expected {expected} values ({local_ids} ids x {dim} dims), got {actual}")]
    BufferLengthMismatch {
        data: String,
        expected: usize,
        actual: usize,
        local_ids: usize,
        dim: usize,
    },

    #[error("action '{0}' was marked fulfilled but was never required")]
    UnrequiredAction(String),

    #[error("advance() called before initialize()")]
    NotInitialized,

    #[error("initialize() called on a scheme that has already been initialized")]
    AlreadyInitialized,
}

/// The top-level error type returned by fallible operations in this crate.
/// `Transport` wraps the underlying I/O error directly: any I/O failure on a
/// point-to-point channel is fatal and carries no recovery path (§4.7).
#[derive(Debug, Error)]
pub enum CouplingError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error on rank {rank} talking to '{peer}': {source}")]
    Transport {
        rank: usize,
        peer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("usage error: {0}")]
    Usage(#[from] UsageError),
}

impl CouplingError {
    /// Wraps an I/O failure on a point-to-point channel with the participant
    /// and rank context needed for the diagnostic required by §7.
    pub fn transport(rank: usize, peer: impl Into<String>, source: std::io::Error) -> Self {
        CouplingError::Transport {
            rank,
            peer: peer.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CouplingError>;
