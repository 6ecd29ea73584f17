//! Append-only time-series store for sampler points and completions
//! (spec.md §4.3).
//!
//! A single mutex covers both series, matching the shared-resource policy in
//! spec.md §5 ("Collector series: single mutex covering all appends and
//! reads"). Reads return owned copies so the visualiser (out of scope here)
//! never holds a lock across its own rendering work.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

/// One sampler tick, recorded by [`crate::sampler::Sampler`].
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    /// Simulation-relative time, in seconds.
    pub t: f64,
    /// Mean in-flight latency at this tick, in seconds.
    pub mean_latency: f64,
    /// Total worker count at this tick.
    pub n_workers: usize,
    /// Count of busy workers plus pending requests contributing to the mean.
    pub n_active: usize,
    /// `setpoint - mean_latency`.
    pub error: f64,
    /// Arrivals since the previous tick.
    pub arrivals_since_last: u64,
}

/// One request completion, recorded by a [`crate::worker::Worker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionPoint {
    /// Simulation-relative completion time, in seconds.
    pub t: f64,
    /// End-to-end latency for this request, in seconds.
    pub latency: f64,
}

struct State {
    samples: Vec<SamplePoint>,
    completions: Vec<CompletionPoint>,
}

struct Inner {
    state: Mutex<State>,
    sim_start: Instant,
}

/// Thread-safe, cheaply cloneable handle to the series store.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

impl Collector {
    /// Creates an empty collector anchored to `sim_start`, used by
    /// [`Collector::slo_compliance`] to determine "now".
    pub fn new(sim_start: Instant) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    samples: Vec::new(),
                    completions: Vec::new(),
                }),
                sim_start,
            }),
        }
    }

    /// Appends a sampler point.
    pub async fn record_sample(&self, point: SamplePoint) {
        self.inner.state.lock().await.samples.push(point);
    }

    /// Appends a completion point.
    pub async fn record_completion(&self, t: f64, latency: f64) {
        self.inner
            .state
            .lock()
            .await
            .completions
            .push(CompletionPoint { t, latency });
    }

    /// Returns copies of both series, in recording order.
    pub async fn snapshot(&self) -> (Vec<SamplePoint>, Vec<CompletionPoint>) {
        let state = self.inner.state.lock().await;
        (state.samples.clone(), state.completions.clone())
    }

    /// Percentage of completions within `window_s` of "now" whose latency is
    /// at most `setpoint_s + band_s`. Fast completions are never penalized.
    /// Returns 100.0 when there are no completions in the window (spec.md
    /// §4.3).
    pub async fn slo_compliance(&self, window_s: f64, setpoint_s: f64, band_s: f64) -> f64 {
        let now = self.inner.sim_start.elapsed().as_secs_f64();
        let lower_bound = now - window_s;
        let threshold = setpoint_s + band_s;

        let state = self.inner.state.lock().await;
        let recent: Vec<&CompletionPoint> = state
            .completions
            .iter()
            .filter(|c| c.t >= lower_bound)
            .collect();

        if recent.is_empty() {
            return 100.0;
        }

        let compliant = recent.iter().filter(|c| c.latency <= threshold).count();
        (compliant as f64 / recent.len() as f64) * 100.0
    }
}
