//! Workload generator (spec.md §4.6).
//!
//! Three independently runnable sources feed the same [`crate::manager::Manager`]:
//! a baseline task (steady rate or legacy uniform-jitter variant), an
//! on-demand burst/DoS task, and an optional CSV-driven replacement for the
//! baseline. Out of scope per spec.md §1, but the interfaces it talks to
//! (`receive_request`) are the core, so this module is grounded in the same
//! task-spawning idiom as `worker` and `manager`.

pub mod baseline;
pub mod burst;
pub mod csv_source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::manager::Manager;

pub use baseline::BaselineVariant;

struct Inner {
    manager: Manager,
    sim_start: Instant,
    burst_active: tokio::sync::Mutex<bool>,
    running: AtomicBool,
}

/// Handle to the workload generator. Owns its baseline/burst task handles;
/// [`Client::stop`] signals termination and waits for them.
pub struct Client {
    inner: Arc<Inner>,
    baseline_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    burst_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Boots the baseline task. `f_base_hz` and `base_processing_ms` are the
    /// steady-rate parameters (spec.md §4.6); `variant` picks the
    /// fixed-interval or legacy jittered arrival schedule.
    pub fn start(
        manager: Manager,
        sim_start: Instant,
        f_base_hz: f64,
        base_processing_ms: f64,
        variant: BaselineVariant,
    ) -> Self {
        let inner = Arc::new(Inner {
            manager,
            sim_start,
            burst_active: tokio::sync::Mutex::new(false),
            running: AtomicBool::new(true),
        });

        let task_inner = Arc::clone(&inner);
        let handle = tokio::spawn(baseline::run(task_inner, f_base_hz, base_processing_ms, variant));

        Self {
            inner,
            baseline_handle: tokio::sync::Mutex::new(Some(handle)),
            burst_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Boots a CSV-replay task in place of the baseline (spec.md §6,
    /// "alternative workload source"). The schedule was already loaded and
    /// validated by [`csv_source::load_csv`]; this task only replays it.
    pub fn start_csv(manager: Manager, sim_start: Instant, schedule: Vec<(f64, f64)>) -> Self {
        let inner = Arc::new(Inner {
            manager,
            sim_start,
            burst_active: tokio::sync::Mutex::new(false),
            running: AtomicBool::new(true),
        });

        let task_inner = Arc::clone(&inner);
        let handle = tokio::spawn(csv_source::run(task_inner, schedule));

        Self {
            inner,
            baseline_handle: tokio::sync::Mutex::new(Some(handle)),
            burst_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Starts a bounded-duration elevated-rate burst. Ignored with a warning
    /// if a burst is already in flight (spec.md §7, "overlapping burst").
    pub async fn trigger_burst(&self, duration_s: f64, f_burst_hz: f64) {
        let mut active = self.inner.burst_active.lock().await;
        if *active {
            warn!("trigger_burst: a burst is already active, ignoring");
            return;
        }
        *active = true;
        drop(active);

        let task_inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(burst::run(task_inner, duration_s, f_burst_hz));
        *self.burst_handle.lock().await = Some(handle);
    }

    /// Signals termination and waits for both tasks to finish.
    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::Relaxed);

        if let Some(handle) = self.baseline_handle.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.burst_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

async fn emit(inner: &Inner, processing_s: f64) {
    let arrival = inner.sim_start.elapsed().as_secs_f64();
    inner.manager.receive_request(arrival, processing_s).await;
}
