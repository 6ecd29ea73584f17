//! Error types for the simulator.
//!
//! This module provides a small, focused error hierarchy using `thiserror`.
//! Per the recovery discipline of the control loop, almost every fault in the
//! running simulation (under-min scale-down, no idle worker to destroy, an
//! overlapping burst request) is logged and absorbed in place rather than
//! surfaced as a `Result` — see `manager` and `client`. `Error` is reserved
//! for startup-time configuration failures and malformed workload input.

pub mod config;
pub mod workload;

use thiserror::Error;

pub use config::ConfigError;
pub use workload::WorkloadError;

/// Top-level error type for the simulator binary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or invalid startup flags).
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Workload source error (unreadable CSV file).
    #[error(transparent)]
    Workload(#[from] WorkloadError),
}
