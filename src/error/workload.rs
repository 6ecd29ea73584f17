//! Workload source error types.

use thiserror::Error;

/// Errors raised while loading a CSV workload file.
///
/// A malformed individual *row* is never fatal — see
/// [`crate::client::csv_source::load_csv`], which logs a warning and skips
/// it (spec.md §6). This type covers failures of the file as a whole.
#[derive(Error, Debug)]
pub enum WorkloadError {
    /// The CSV file could not be opened or read.
    #[error("failed to read workload CSV at {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
