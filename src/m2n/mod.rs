//! mesh-to-mesh data exchange (§4.4).
//!
//! Given two already-partitioned meshes on two participants and the routing
//! map from [`crate::partition::FeedbackMap`], a [`DistributedCommunication`]
//! moves `Data` buffers across the boundary. Both implementations share one
//! contract: `values` is the *full* local vertex buffer (vertex-major, `dim`
//! components per vertex), matching the mesh's own `Data` layout — only
//! owned vertices actually go on the wire, non-owned local vertices are left
//! untouched on receive (ghost-copy synchronization is a mapping-layer
//! concern, out of scope per §1).

pub mod gather_scatter;
pub mod point_to_point;

pub use gather_scatter::GatherScatter;
pub use point_to_point::PointToPoint;

use crate::constraint::Constraint;
use crate::error::Result;

/// Shared contract for both m2n implementations (§4.4).
pub trait DistributedCommunication {
    /// Sends this rank's owned-vertex slice of `values` (length `|local
    /// vertices| * dim`) to the peer participant.
    fn send(&mut self, values: &[f64], dim: usize, constraint: Constraint) -> Result<()>;

    /// Blocks until all expected bytes have arrived, then writes the
    /// received values for this rank's owned vertices into `values` (length
    /// `|local vertices| * dim`). Entries for non-owned local vertices are
    /// left unchanged.
    fn receive(&mut self, values: &mut [f64], dim: usize, constraint: Constraint) -> Result<()>;

    /// A single control bit, master-to-master with a local broadcast to
    /// secondaries — used for the convergence verdict in §4.6.
    fn send_bool(&mut self, value: bool) -> Result<()>;
    fn receive_bool(&mut self) -> Result<bool>;
}
