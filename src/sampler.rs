//! Periodic in-flight latency sampler (spec.md §4.4).
//!
//! The sampler's tick cadence *is* the control cadence: it is the only
//! caller of [`crate::controller::Controller::on_sample`]. It never mutates
//! queues, workers, or the setpoint — only reads snapshots.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::collector::{Collector, SamplePoint};
use crate::controller::Controller;
use crate::manager::Manager;

/// Runtime-mutable sampler parameters (spec.md §3: "Setpoint ... mutable at
/// runtime"; §5: "protected by the Sampler/Manager field mutex").
struct Params {
    setpoint_s: AtomicU64,
    interval_s: AtomicU64,
}

fn to_bits(v: f64) -> u64 {
    v.to_bits()
}

fn from_bits(v: u64) -> f64 {
    f64::from_bits(v)
}

/// Handle to the running sampler task. Cloning shares the same parameters
/// and stop flag.
#[derive(Clone)]
pub struct Sampler {
    params: Arc<Params>,
    running: Arc<AtomicBool>,
}

impl Sampler {
    /// Creates a sampler and immediately spawns its tick loop.
    pub fn spawn(
        setpoint_s: f64,
        interval_s: f64,
        manager: Manager,
        collector: Collector,
        controller: Controller,
        sim_start: Instant,
    ) -> Self {
        let params = Arc::new(Params {
            setpoint_s: AtomicU64::new(to_bits(setpoint_s)),
            interval_s: AtomicU64::new(to_bits(interval_s)),
        });
        let running = Arc::new(AtomicBool::new(true));

        let task_params = Arc::clone(&params);
        let task_running = Arc::clone(&running);
        tokio::spawn(run(task_params, task_running, manager, collector, controller, sim_start));

        Self { params, running }
    }

    /// Updates the desired mean in-flight latency. Takes effect on the next
    /// tick (spec.md invariant 11).
    pub fn set_setpoint(&self, setpoint_s: f64) {
        self.params.setpoint_s.store(to_bits(setpoint_s), Ordering::Relaxed);
    }

    /// Current setpoint.
    pub fn setpoint(&self) -> f64 {
        from_bits(self.params.setpoint_s.load(Ordering::Relaxed))
    }

    /// Updates the tick interval. Takes effect after the sleep currently in
    /// progress completes.
    pub fn set_interval(&self, interval_s: f64) {
        self.params.interval_s.store(to_bits(interval_s), Ordering::Relaxed);
    }

    /// Stops the tick loop after its current sleep/tick finishes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

async fn run(
    params: Arc<Params>,
    running: Arc<AtomicBool>,
    manager: Manager,
    collector: Collector,
    controller: Controller,
    sim_start: Instant,
) {
    while running.load(Ordering::Relaxed) {
        let interval = from_bits(params.interval_s.load(Ordering::Relaxed));
        tokio::time::sleep(Duration::from_secs_f64(interval.max(0.0))).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let setpoint = from_bits(params.setpoint_s.load(Ordering::Relaxed));
        let t_ref = sim_start.elapsed().as_secs_f64();

        let (sum, count) = in_flight_sum(&manager, t_ref).await;
        let (mean_latency, n_active) = if count == 0 { (0.0, 0) } else { (sum / count as f64, count) };

        let error = setpoint - mean_latency;
        let arrivals_since_last = manager.take_new_count().await;
        let n_workers = manager.worker_count().await;

        collector
            .record_sample(SamplePoint {
                t: t_ref,
                mean_latency,
                n_workers,
                n_active: n_active as usize,
                error,
                arrivals_since_last,
            })
            .await;

        debug!(t_ref, mean_latency, n_active, error, "sampler tick");
        controller.on_sample(error, &manager).await;
    }
}

/// Sums `t_ref - arrival` over busy workers and over the pending-queue
/// snapshot, returning `(sum, count)` (spec.md §4.4 step 2).
async fn in_flight_sum(manager: &Manager, t_ref: f64) -> (f64, u64) {
    let mut sum = 0.0;
    let mut count = 0u64;

    for (busy, arrival) in manager.worker_snapshot().await {
        if busy {
            if let Some(arrival) = arrival {
                sum += t_ref - arrival;
                count += 1;
            }
        }
    }

    for req in manager.snapshot_pending().await {
        sum += t_ref - req.arrival_time;
        count += 1;
    }

    (sum, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn idle_pool_yields_zero_mean_latency() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector.clone(), Instant::now());
        manager.create_worker().await;

        let (sum, count) = in_flight_sum(&manager, 10.0).await;
        assert_eq!(sum, 0.0);
        assert_eq!(count, 0);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn busy_worker_and_pending_request_both_contribute() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector.clone(), Instant::now());
        manager.create_worker().await;
        manager.receive_request(0.0, 1.0).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.receive_request(0.0, 1.0).await;

        let (sum, count) = in_flight_sum(&manager, 1.0).await;
        assert_eq!(count, 2, "one busy worker plus one pending request");
        assert!(sum > 0.0);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn setpoint_and_interval_updates_are_visible() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector.clone(), Instant::now());
        manager.create_worker().await;
        let controller = Controller::new(crate::controller::ControllerConfig {
            kp: 0.0,
            kd: 0.0,
            deadband_s: 0.0,
        });

        let sampler = Sampler::spawn(1.0, 60.0, manager.clone(), collector, controller, Instant::now());
        assert_eq!(sampler.setpoint(), 1.0);

        sampler.set_setpoint(2.5);
        assert_eq!(sampler.setpoint(), 2.5);

        sampler.stop();
        manager.shutdown().await;
    }
}
