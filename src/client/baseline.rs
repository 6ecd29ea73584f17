//! Steady-rate arrival generator (spec.md §4.6, "Baseline task").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::{emit, Inner};

/// Which inter-arrival schedule the baseline task uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineVariant {
    /// Fixed interval of `1 / f_base_hz` between arrivals.
    FixedInterval,
    /// Legacy variant: each interval drawn uniformly from
    /// `[0.5 / f_base_hz, 1.5 / f_base_hz]` (spec.md §4.6, "Alternative
    /// legacy baseline").
    UniformJitter,
}

pub(super) async fn run(inner: Arc<Inner>, f_base_hz: f64, base_processing_ms: f64, variant: BaselineVariant) {
    let processing_s = base_processing_ms / 1000.0;
    let nominal_interval = 1.0 / f_base_hz;

    while inner.running.load(Ordering::Relaxed) {
        let interval = match variant {
            BaselineVariant::FixedInterval => nominal_interval,
            BaselineVariant::UniformJitter => {
                rand::rng().random_range((0.5 * nominal_interval)..=(1.5 * nominal_interval))
            }
        };

        tokio::time::sleep(Duration::from_secs_f64(interval.max(0.0))).await;
        if !inner.running.load(Ordering::Relaxed) {
            break;
        }

        emit(&inner, processing_s).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::manager::{Manager, ManagerConfig};
    use std::time::Instant;

    #[tokio::test]
    async fn fixed_interval_produces_expected_arrival_count() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector, Instant::now());
        manager.create_worker().await;

        let client = super::super::Client::start(
            manager.clone(),
            Instant::now(),
            20.0,
            1.0,
            BaselineVariant::FixedInterval,
        );

        tokio::time::sleep(Duration::from_millis(220)).await;
        client.stop().await;

        let count = manager.take_new_count().await;
        assert!((2..=6).contains(&count), "expected roughly 4 arrivals at 20Hz over 220ms, got {count}");

        manager.shutdown().await;
    }
}
