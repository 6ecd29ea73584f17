//! Bounded-duration elevated-rate arrival generator (spec.md §4.6, "Burst
//! (DoS) task").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{emit, Inner};

pub(super) async fn run(inner: Arc<Inner>, duration_s: f64, f_burst_hz: f64) {
    let interval = Duration::from_secs_f64((1.0 / f_burst_hz).max(0.0));
    let deadline = Instant::now() + Duration::from_secs_f64(duration_s.max(0.0));

    while Instant::now() < deadline && inner.running.load(Ordering::Relaxed) {
        tokio::time::sleep(interval).await;
        if !inner.running.load(Ordering::Relaxed) || Instant::now() >= deadline {
            break;
        }
        emit(&inner, 0.0).await;
    }

    *inner.burst_active.lock().await = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BaselineVariant;
    use crate::collector::Collector;
    use crate::manager::{Manager, ManagerConfig};

    #[tokio::test]
    async fn burst_stops_after_duration() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector, Instant::now());
        manager.create_worker().await;

        let client = super::super::Client::start(
            manager.clone(),
            Instant::now(),
            0.001, // effectively disable the baseline within this short test
            0.0,
            BaselineVariant::FixedInterval,
        );
        client.trigger_burst(0.1, 50.0).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        let count_during = manager.take_new_count().await;
        assert!(count_during > 0, "burst should have produced arrivals");

        tokio::time::sleep(Duration::from_millis(100)).await;
        let count_after = manager.take_new_count().await;
        assert_eq!(count_after, 0, "burst must stop producing arrivals once its duration elapses");

        client.stop().await;
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn overlapping_burst_is_ignored() {
        let collector = Collector::new(Instant::now());
        let manager = Manager::new(ManagerConfig::new(1, 1), collector, Instant::now());
        manager.create_worker().await;

        let client = super::super::Client::start(
            manager.clone(),
            Instant::now(),
            0.001,
            0.0,
            BaselineVariant::FixedInterval,
        );
        client.trigger_burst(0.3, 20.0).await;
        client.trigger_burst(0.3, 20.0).await; // should warn and no-op

        tokio::time::sleep(Duration::from_millis(350)).await;
        client.stop().await;
        manager.shutdown().await;
    }
}
