//! Proportional–derivative scale controller (spec.md §4.5).
//!
//! The "P" contribution is a discretised threshold table rather than a
//! continuous gain — `Kp` is retained in configuration for future tuning but
//! is not read by [`Controller::on_sample`] directly.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::manager::Manager;

/// Intermediate threshold separating the `±1` and `±2` threshold bands.
const SECOND_THRESHOLD: f64 = 0.6;

/// Controller gains and deadband, fixed at startup (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub kp: f64,
    pub kd: f64,
    pub deadband_s: f64,
}

fn to_bits(v: f64) -> u64 {
    v.to_bits()
}

fn from_bits(v: u64) -> f64 {
    f64::from_bits(v)
}

/// PD controller. `prev_error` is the only mutable state, updated once per
/// invocation.
#[derive(Clone)]
pub struct Controller {
    config: ControllerConfig,
    prev_error: std::sync::Arc<AtomicU64>,
    ticks: std::sync::Arc<AtomicU64>,
}

impl Controller {
    /// Creates a controller with `prev_error = 0`.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            prev_error: std::sync::Arc::new(AtomicU64::new(to_bits(0.0))),
            ticks: std::sync::Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of times [`Controller::on_sample`] has run.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Discretised threshold term for the given error (spec.md §4.5 table).
    fn threshold_term(&self, error: f64) -> f64 {
        let magnitude = error.abs();
        if magnitude < self.config.deadband_s {
            0.0
        } else if magnitude < self.config.deadband_s + SECOND_THRESHOLD {
            if error > 0.0 { -1.0 } else { 1.0 }
        } else if error > 0.0 {
            -2.0
        } else {
            2.0
        }
    }

    /// Consumes one sampler tick: computes the control signal from `error`
    /// and commands [`Manager::scale`]. `error = setpoint - measured`;
    /// `error > 0` means the system is faster than needed (shrink),
    /// `error < 0` means slower than needed (grow).
    pub async fn on_sample(&self, error: f64, manager: &Manager) {
        let prev_error = from_bits(self.prev_error.load(Ordering::Relaxed));
        let threshold = self.threshold_term(error);
        let derivative = self.config.kd * (error - prev_error);
        let signal = threshold + derivative;

        self.prev_error.store(to_bits(error), Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);

        debug!(error, threshold, derivative, signal, "controller tick");
        if signal != 0.0 {
            manager.scale(signal).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::manager::ManagerConfig;
    use std::time::Instant;

    fn manager(min: usize, max: usize) -> Manager {
        Manager::new(ManagerConfig::new(min, max), Collector::new(Instant::now()), Instant::now())
    }

    #[test]
    fn deadband_suppresses_small_errors() {
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 0.0, deadband_s: 0.5 });
        assert_eq!(controller.threshold_term(0.3), 0.0);
        assert_eq!(controller.threshold_term(-0.3), 0.0);
    }

    #[test]
    fn first_band_emits_unit_term() {
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 0.0, deadband_s: 0.0 });
        assert_eq!(controller.threshold_term(0.4), -1.0, "positive error (too fast) shrinks");
        assert_eq!(controller.threshold_term(-0.4), 1.0, "negative error (too slow) grows");
    }

    #[test]
    fn second_band_emits_double_term() {
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 0.0, deadband_s: 0.0 });
        assert_eq!(controller.threshold_term(0.8), -2.0);
        assert_eq!(controller.threshold_term(-0.8), 2.0);
    }

    #[tokio::test]
    async fn zero_gain_and_full_deadband_never_scales() {
        // spec.md §8, invariant 9.
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 0.0, deadband_s: 100.0 });
        let mgr = manager(1, 5);
        mgr.create_worker().await;

        controller.on_sample(5.0, &mgr).await;
        controller.on_sample(-5.0, &mgr).await;
        assert_eq!(mgr.worker_count().await, 1);

        mgr.shutdown().await;
    }

    #[tokio::test]
    async fn derivative_term_alone_can_trigger_scale() {
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 7.0, deadband_s: 100.0 });
        let mgr = manager(1, 5);
        mgr.create_worker().await;

        controller.on_sample(0.0, &mgr).await;
        controller.on_sample(-1.0, &mgr).await;
        assert!(mgr.worker_count().await > 1, "large negative swing should grow via derivative term alone");

        mgr.shutdown().await;
    }

    #[test]
    fn tick_count_increments_once_per_call() {
        let controller = Controller::new(ControllerConfig { kp: 0.0, kd: 0.0, deadband_s: 1.0 });
        assert_eq!(controller.tick_count(), 0);
    }
}
