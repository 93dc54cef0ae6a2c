//! Structured diagnostics.
//!
//! Spans bracket the coupling-protocol phases (`initialize`, `advance`,
//! `finalize`, partitioning rounds, m2n exchanges) so a participant's log can
//! be read back as a trace of the state machine rather than a flat stream.
//! Fatal errors are logged at `error` level immediately before they
//! propagate out of the crate; non-convergence and empty-filter ranks (both
//! non-fatal per §4.7) are logged at `warn`.

use tracing_subscriber::EnvFilter;

/// Installs a process-wide `tracing` subscriber. Examples and integration
/// tests call this once; library code never installs a subscriber itself; it
/// only emits events through the ambient one.
///
/// `filter` follows `tracing_subscriber::EnvFilter` syntax, e.g. `"info"` or
/// `"confluence=debug,warn"`. Falls back to `RUST_LOG`, then `"info"`.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
