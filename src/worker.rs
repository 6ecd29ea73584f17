//! A single-request-at-a-time processing worker (spec.md §4.1).
//!
//! A `Worker` owns one inbox slot. The manager's dispatcher only ever submits
//! to a worker it has already confirmed is free, so the inbox never needs
//! more than one slot of capacity and `submit` never blocks in practice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::request::Request;

/// How long [`Worker::stop`] waits for the processing task to exit on its
/// own before force-aborting it (spec.md §5: "bounded timeout (e.g. 2 s)").
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

enum Mail {
    Process(Request),
    Stop,
}

#[derive(Default)]
struct RuntimeState {
    busy: bool,
    current_arrival: Option<f64>,
}

/// A worker task plus the handle used to talk to it.
///
/// Identity (`id`) is assigned once by the [`crate::manager::Manager`] and
/// never reused, even after the worker is destroyed.
pub struct Worker {
    id: u64,
    inbox: mpsc::Sender<Mail>,
    state: Arc<Mutex<RuntimeState>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawns a new worker task.
    ///
    /// `free_workers` is the manager's free-worker counting semaphore: the
    /// worker releases a permit on every completion (spec.md §3, free-worker
    /// counter invariant ii). `collector` receives one completion point per
    /// finished request. `sim_start` anchors simulation-relative timestamps.
    pub fn spawn(id: u64, free_workers: Arc<Semaphore>, collector: Collector, sim_start: Instant) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let state = Arc::new(Mutex::new(RuntimeState::default()));

        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(run(id, rx, task_state, free_workers, collector, sim_start));

        Self {
            id,
            inbox: tx,
            state,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Monotonically assigned, never-reused worker identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hands a request to this worker.
    ///
    /// The caller must already hold a free-worker slot reservation (i.e.
    /// this worker was just observed free under the manager's workers
    /// lock) — the worker itself never rejects a submission.
    pub async fn submit(&self, req: Request) {
        if self.inbox.send(Mail::Process(req)).await.is_err() {
            warn!(worker_id = self.id, "submit to a worker whose task already exited");
        }
    }

    /// `true` iff the worker is not currently processing a request.
    pub async fn is_free(&self) -> bool {
        !self.state.lock().await.busy
    }

    /// `(busy, current_arrival)`, read atomically together.
    pub async fn current(&self) -> (bool, Option<f64>) {
        let state = self.state.lock().await;
        (state.busy, state.current_arrival)
    }

    /// Sends the termination sentinel and waits (bounded) for the task to
    /// exit. On timeout, force-aborts the task and logs a warning (spec.md
    /// §7, "Shutdown races").
    pub async fn stop(&self) {
        let _ = self.inbox.send(Mail::Stop).await;

        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
                warn!(worker_id = self.id, "worker did not stop within timeout; aborting");
                abort.abort();
            }
        }
    }
}

async fn run(
    id: u64,
    mut inbox: mpsc::Receiver<Mail>,
    state: Arc<Mutex<RuntimeState>>,
    free_workers: Arc<Semaphore>,
    collector: Collector,
    sim_start: Instant,
) {
    while let Some(mail) = inbox.recv().await {
        let req = match mail {
            Mail::Process(req) => req,
            Mail::Stop => break,
        };

        {
            let mut state = state.lock().await;
            state.busy = true;
            state.current_arrival = Some(req.arrival_time);
        }

        let processing_time = req.normalized_processing_time();
        debug!(worker_id = id, processing_time, "worker processing request");
        if processing_time > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(processing_time)).await;
        }

        {
            let mut state = state.lock().await;
            state.busy = false;
            state.current_arrival = None;
        }

        free_workers.add_permits(1);

        let now = sim_start.elapsed().as_secs_f64();
        let latency = now - req.arrival_time;
        collector.record_completion(now, latency).await;
    }

    debug!(worker_id = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;

    #[tokio::test]
    async fn submit_completes_and_frees_semaphore() {
        let free = Arc::new(Semaphore::new(0));
        let collector = Collector::new(Instant::now());
        let sim_start = Instant::now();
        let worker = Worker::spawn(0, Arc::clone(&free), collector.clone(), sim_start);

        assert!(worker.is_free().await, "worker should start idle");

        worker.submit(Request::new(0.0, 0.01)).await;
        // Give the worker a moment to pick up the request.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!worker.is_free().await, "worker should be busy mid-request");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(worker.is_free().await, "worker should be idle again after completion");
        assert_eq!(free.available_permits(), 1, "completion should release one free-worker permit");

        let (_, completions) = collector.snapshot().await;
        assert_eq!(completions.len(), 1, "exactly one completion should be recorded");

        worker.stop().await;
    }

    #[tokio::test]
    async fn zero_processing_time_completes_without_sleep() {
        let free = Arc::new(Semaphore::new(0));
        let collector = Collector::new(Instant::now());
        let worker = Worker::spawn(1, free, collector, Instant::now());

        let started = Instant::now();
        worker.submit(Request::new(0.0, 0.0)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(worker.is_free().await);
        assert!(started.elapsed() < Duration::from_millis(100));

        worker.stop().await;
    }

    #[tokio::test]
    async fn negative_processing_time_is_treated_as_zero() {
        let free = Arc::new(Semaphore::new(0));
        let collector = Collector::new(Instant::now());
        let worker = Worker::spawn(2, free, collector, Instant::now());

        worker.submit(Request::new(0.0, -5.0)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(worker.is_free().await, "negative processing_time should not hang the worker");

        worker.stop().await;
    }
}
