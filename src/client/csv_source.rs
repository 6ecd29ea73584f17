//! CSV-driven workload replay (spec.md §6, "Workload source").
//!
//! Each row is `(wait_ms, processing_ms)`: `wait_ms` is the inter-arrival gap
//! from the previous row (or from `sim_start` for the first row),
//! `processing_ms` the service time. The schedule does not loop; when
//! exhausted the task simply ends (spec.md §9, open question).

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::WorkloadError;

use super::{emit, Inner};

#[derive(Debug, serde::Deserialize)]
struct Row {
    wait_ms: f64,
    processing_ms: f64,
}

/// Reads and validates the CSV at `path`. Malformed individual rows are
/// skipped with a warning (spec.md §6); only a failure to open or read the
/// file itself is returned as an error.
pub fn load_csv(path: &str) -> Result<Vec<(f64, f64)>, WorkloadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| WorkloadError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, source),
        })?;

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<Row>().enumerate() {
        match record {
            Ok(row) => rows.push((row.wait_ms, row.processing_ms)),
            Err(err) => warn!(row = idx, error = %err, "skipping malformed workload CSV row"),
        }
    }

    Ok(rows)
}

/// Replays a loaded schedule against the shared client state, honoring each
/// row's `wait_ms` gap before enqueueing it. Does not loop; returns once the
/// schedule is exhausted or the client is stopped.
pub(super) async fn run(inner: Arc<Inner>, schedule: Vec<(f64, f64)>) {
    for (wait_ms, processing_ms) in schedule {
        if !inner.running.load(Ordering::Relaxed) {
            break;
        }
        tokio::time::sleep(Duration::from_secs_f64((wait_ms / 1000.0).max(0.0))).await;
        if !inner.running.load(Ordering::Relaxed) {
            break;
        }

        emit(&inner, processing_ms / 1000.0).await;
    }
}
