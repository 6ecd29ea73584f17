//! Structured log sink setup (spec.md §6, "Log sink").
//!
//! `RUST_LOG` controls verbosity; defaults to INFO-and-above when unset, so
//! lifecycle events and scale actions are visible out of the box while
//! per-tick sampler detail stays opt-in at DEBUG.

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Call once, at process startup.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
