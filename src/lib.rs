//! Coupling runtime for partitioned multi-physics simulation (§1, §2).
//!
//! Module dependency order, leaves first: [`error`] and [`logging`] are
//! ambient; [`constraint`] and [`num_vec`] are plain value types; [`mesh`]
//! builds on both; [`transport`] and [`intracomm`] are the wire/process-group
//! primitives; [`partition`] and [`m2n`] consume them to reconcile and
//! exchange mesh data across participants; [`coupling_data`] and
//! [`coupling_scheme`] drive the time-window protocol on top of that;
//! [`config`] validates the typed records an external parser produces; and
//! [`api`] is the thin solver-facing surface wiring all of the above
//! together.

pub mod api;
pub mod config;
pub mod constraint;
pub mod coupling_data;
pub mod coupling_scheme;
pub mod error;
pub mod intracomm;
pub mod logging;
pub mod m2n;
pub mod mesh;
pub mod num_vec;
pub mod partition;
pub mod transport;
