//! Worker pool owner and request dispatcher (spec.md §4.2).
//!
//! Two counting semaphores decouple admission from placement: the
//! arrival-notifier blocks the dispatcher on an empty queue, the
//! free-worker semaphore blocks it until some worker is idle. Acquiring
//! either one permanently consumes a token (`Permit::forget`) rather than
//! returning it on drop — they are genuine counting semaphores, not
//! capacity guards.

mod config;

pub use config::ManagerConfig;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collector::Collector;
use crate::request::Request;
use crate::worker::Worker;

struct Inner {
    config: ManagerConfig,
    workers: Mutex<Vec<Worker>>,
    pending: Mutex<VecDeque<Option<Request>>>,
    new_count: Mutex<u64>,
    arrival_notifier: Semaphore,
    free_workers: Arc<Semaphore>,
    next_id: AtomicU64,
    collector: Collector,
    sim_start: Instant,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the worker set, the pending-request queue, and the dispatcher task.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

impl Manager {
    /// Builds a manager with an empty worker set and spawns its dispatcher
    /// task. Callers are expected to bring the pool up to `min_workers`
    /// with [`Manager::create_worker`] before traffic starts (see
    /// SPEC_FULL.md's note on startup ordering).
    pub fn new(config: ManagerConfig, collector: Collector, sim_start: Instant) -> Self {
        let inner = Arc::new(Inner {
            config,
            workers: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            new_count: Mutex::new(0),
            arrival_notifier: Semaphore::new(0),
            free_workers: Arc::new(Semaphore::new(0)),
            next_id: AtomicU64::new(0),
            collector,
            sim_start,
            dispatcher: Mutex::new(None),
        });

        let dispatcher_inner = Arc::clone(&inner);
        let handle = tokio::spawn(run_dispatcher(dispatcher_inner));
        // `Mutex::try_lock` is safe here: nothing else has a reference to
        // `inner` yet, so the lock is always uncontended.
        *inner
            .dispatcher
            .try_lock()
            .expect("dispatcher mutex uncontended during construction") = Some(handle);

        Self { inner }
    }

    /// Current number of workers (free or busy).
    pub async fn worker_count(&self) -> usize {
        self.inner.workers.lock().await.len()
    }

    /// Configured lower bound on worker count.
    pub fn min_workers(&self) -> usize {
        self.inner.config.min_workers
    }

    /// Configured upper bound on worker count.
    pub fn max_workers(&self) -> usize {
        self.inner.config.max_workers()
    }

    /// Number of workers observed free right now (best-effort — see
    /// spec.md §5 on the worker list being a best-effort read).
    pub fn free_worker_count(&self) -> usize {
        self.inner.free_workers.available_permits()
    }

    /// Attempts to raise or lower `max_workers`. On rejection (new bound
    /// below `min_workers` or below the current worker count) logs a
    /// warning and leaves the bound untouched (spec.md §7).
    pub async fn set_max_workers(&self, new_max: usize) {
        let current = self.worker_count().await;
        if self.inner.config.try_set_max_workers(new_max, current).is_err() {
            warn!(
                new_max,
                current, min_workers = self.min_workers(), "rejected invalid max_workers"
            );
        } else {
            info!(new_max, "max_workers updated");
        }
    }

    /// Allocates a new worker, starts it, and releases one free-worker
    /// permit. `id`s are assigned once and never reused.
    pub async fn create_worker(&self) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let worker = Worker::spawn(
            id,
            Arc::clone(&self.inner.free_workers),
            self.inner.collector.clone(),
            self.inner.sim_start,
        );

        self.inner.workers.lock().await.push(worker);
        self.inner.free_workers.add_permits(1);
        info!(worker_id = id, "worker created");
    }

    /// Removes at most one idle worker. No-ops (with a log line) if the
    /// pool is already at `min_workers`, or if no worker is currently free
    /// (spec.md §7: "under-min scale-down" / "no idle worker to destroy").
    pub async fn destroy_worker(&self) {
        let current = self.worker_count().await;
        if current <= self.inner.config.min_workers {
            warn!(
                current,
                min_workers = self.inner.config.min_workers,
                "destroy_worker: already at min_workers, no-op"
            );
            return;
        }

        let permit = match self.inner.free_workers.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("destroy_worker: no idle worker to destroy, no-op");
                return;
            }
        };
        permit.forget();

        let mut workers = self.inner.workers.lock().await;
        let mut target = None;
        for (idx, worker) in workers.iter().enumerate() {
            if worker.is_free().await {
                target = Some(idx);
                break;
            }
        }

        match target {
            Some(idx) => {
                let worker = workers.remove(idx);
                drop(workers);
                let id = worker.id();
                worker.stop().await;
                info!(worker_id = id, "worker destroyed");
            }
            None => {
                // Transient inconsistency window: the semaphore said a
                // worker was free but the scan found none. Give the token
                // back rather than leaking it.
                drop(workers);
                self.inner.free_workers.add_permits(1);
                warn!("destroy_worker: free-worker token had no matching idle worker, releasing it back");
            }
        }
    }

    /// The scale actuator (spec.md §4.2). `signal` is a real number;
    /// positive grows the pool, negative shrinks it. The desired worker
    /// count is `ceil(current + signal)`, clamped to `[min_workers,
    /// max_workers]`.
    pub async fn scale(&self, signal: f64) {
        let current = self.worker_count().await;
        let min = self.inner.config.min_workers as f64;
        let max = self.inner.config.max_workers() as f64;
        let desired = (current as f64 + signal).ceil().clamp(min, max) as usize;

        if desired == current {
            return;
        }

        if desired > current {
            let delta = desired - current;
            info!(signal, from = current, to = desired, "scaling up");
            for _ in 0..delta {
                self.create_worker().await;
            }
        } else {
            let delta = current - desired;
            info!(signal, from = current, to = desired, "scaling down");
            for _ in 0..delta {
                self.destroy_worker().await;
            }
        }
    }

    /// Appends a request to the pending queue and releases one
    /// arrival-notifier permit. Non-blocking; guarantees exactly one future
    /// dispatch (unless [`Manager::clear_pending`] removes it first).
    pub async fn receive_request(&self, arrival_time: f64, processing_time: f64) {
        let request = Request::new(arrival_time, processing_time);
        self.inner.pending.lock().await.push_back(Some(request));
        *self.inner.new_count.lock().await += 1;
        self.inner.arrival_notifier.add_permits(1);
        debug!(arrival_time, processing_time, "request received");
    }

    /// Best-effort `(busy, current_arrival)` snapshot of every worker, in
    /// insertion order (spec.md §5: "the Sampler reads a stable-enough
    /// view").
    pub async fn worker_snapshot(&self) -> Vec<(bool, Option<f64>)> {
        let workers = self.inner.workers.lock().await;
        let mut out = Vec::with_capacity(workers.len());
        for worker in workers.iter() {
            out.push(worker.current().await);
        }
        out
    }

    /// Copies of all requests currently waiting to be dispatched.
    pub async fn snapshot_pending(&self) -> Vec<Request> {
        self.inner
            .pending
            .lock()
            .await
            .iter()
            .filter_map(|entry| *entry)
            .collect()
    }

    /// Returns and resets the arrivals-since-last-call counter.
    pub async fn take_new_count(&self) -> u64 {
        let mut count = self.inner.new_count.lock().await;
        std::mem::take(&mut *count)
    }

    /// Atomically drains all not-yet-dispatched requests, releasing their
    /// arrival-notifier tokens without dispatching them. Used only during
    /// forced shutdown paths (spec.md §4.2).
    pub async fn clear_pending(&self) {
        let mut pending = self.inner.pending.lock().await;
        let mut removed = 0usize;
        while matches!(pending.front(), Some(Some(_))) {
            pending.pop_front();
            removed += 1;
        }
        drop(pending);

        for _ in 0..removed {
            if let Ok(permit) = self.inner.arrival_notifier.try_acquire() {
                permit.forget();
            }
        }
        if removed > 0 {
            warn!(removed, "cleared pending requests without dispatching them");
        }
    }

    /// Drains the queue, stops the dispatcher, and stops every worker.
    pub async fn shutdown(&self) {
        loop {
            if self.inner.pending.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        self.inner.pending.lock().await.push_back(None);
        self.inner.arrival_notifier.add_permits(1);

        let handle = self.inner.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if tokio::time::timeout(std::time::Duration::from_secs(2), handle)
                .await
                .is_err()
            {
                warn!("dispatcher did not stop within timeout");
            }
        }

        let mut workers = self.inner.workers.lock().await;
        for worker in workers.drain(..) {
            worker.stop().await;
        }
        info!("manager shut down");
    }
}

async fn run_dispatcher(inner: Arc<Inner>) {
    loop {
        match inner.arrival_notifier.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => break,
        }

        let next = inner.pending.lock().await.pop_front();
        let request = match next {
            Some(Some(request)) => request,
            Some(None) => {
                info!("dispatcher: sentinel received, stopping");
                break;
            }
            None => {
                warn!("dispatcher: arrival-notifier signaled but queue was empty");
                continue;
            }
        };

        match inner.free_workers.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => break,
        }

        let workers = inner.workers.lock().await;
        for worker in workers.iter() {
            if worker.is_free().await {
                worker.submit(request).await;
                break;
            }
        }
    }
}
