//! Configuration error types.
//!
//! These errors occur while validating startup flags (§6 of the
//! specification). They always prevent the simulator from starting; there is
//! no partial/degraded startup mode.

use thiserror::Error;

/// Errors raised while validating [`crate::config::SimConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A duration or rate that must be strictly positive was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NotPositive {
        /// Name of the offending flag.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// `max_workers` was set below `min_workers`, or below the number of
    /// workers already running.
    #[error("max_workers ({max}) must be >= min_workers ({min})")]
    MaxBelowMin {
        /// Requested maximum.
        max: usize,
        /// Configured minimum.
        min: usize,
    },

    /// `min_workers` was zero.
    #[error("min_workers must be at least 1")]
    MinWorkersZero,
}
