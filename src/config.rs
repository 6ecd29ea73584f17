//! Startup configuration (spec.md §6, "Configuration options").

use clap::Parser;

use crate::client::BaselineVariant;
use crate::controller::ControllerConfig;
use crate::error::ConfigError;
use crate::manager::ManagerConfig;

/// Command-line / environment configuration for the simulator binary.
///
/// Every flag doubles as an environment variable (`CADENCE_SIM_<NAME>`),
/// following the `clap` `env` feature the way `doorway`'s and
/// `elohim-node`'s CLIs do.
#[derive(Debug, Parser)]
#[command(name = "cadence-sim", about = "Closed-loop autoscaling simulator")]
pub struct SimConfig {
    /// Initial desired mean in-flight latency, in seconds.
    #[arg(long, env = "CADENCE_SIM_SETPOINT_S", default_value_t = 1.0)]
    pub setpoint_s: f64,

    /// Sampler tick interval, in seconds.
    #[arg(long, env = "CADENCE_SIM_SAMPLE_INTERVAL_S", default_value_t = 1.0)]
    pub sample_interval_s: f64,

    /// Controller proportional gain (retained for tuning; unused by the
    /// thresholded term directly).
    #[arg(long, env = "CADENCE_SIM_KP", default_value_t = 0.8)]
    pub kp: f64,

    /// Controller derivative gain.
    #[arg(long, env = "CADENCE_SIM_KD", default_value_t = 7.0)]
    pub kd: f64,

    /// Controller deadband, in seconds.
    #[arg(long, env = "CADENCE_SIM_DEADBAND_S", default_value_t = 0.0)]
    pub deadband_s: f64,

    /// Minimum worker-pool size.
    #[arg(long, env = "CADENCE_SIM_MIN_WORKERS", default_value_t = 1)]
    pub min_workers: usize,

    /// Maximum worker-pool size.
    #[arg(long, env = "CADENCE_SIM_MAX_WORKERS", default_value_t = 5)]
    pub max_workers: usize,

    /// Baseline client arrival rate, in Hz.
    #[arg(long, env = "CADENCE_SIM_F_BASE_HZ", default_value_t = 2.0)]
    pub f_base_hz: f64,

    /// Baseline client service time, in milliseconds.
    #[arg(long, env = "CADENCE_SIM_BASE_PROCESSING_MS", default_value_t = 1000.0)]
    pub base_processing_ms: f64,

    /// Use the legacy uniform-jitter baseline schedule instead of a fixed
    /// interval (spec.md §4.6).
    #[arg(long, env = "CADENCE_SIM_LEGACY_JITTER", default_value_t = false)]
    pub legacy_jitter: bool,

    /// SLO compliance band, in seconds.
    #[arg(long, env = "CADENCE_SIM_SLO_BAND_S", default_value_t = 0.2)]
    pub slo_band_s: f64,

    /// SLO compliance sliding-window length, in seconds.
    #[arg(long, env = "CADENCE_SIM_SLO_WINDOW_S", default_value_t = 60.0)]
    pub slo_window_s: f64,

    /// Path to a CSV workload file. When set, replaces the synthetic
    /// baseline client entirely (spec.md §6).
    #[arg(long, env = "CADENCE_SIM_WORKLOAD_CSV_PATH")]
    pub workload_csv_path: Option<String>,
}

impl SimConfig {
    /// Parses `std::env::args()` and validates the result.
    pub fn from_args() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_workers == 0 {
            return Err(ConfigError::MinWorkersZero);
        }
        if self.max_workers < self.min_workers {
            return Err(ConfigError::MaxBelowMin {
                max: self.max_workers,
                min: self.min_workers,
            });
        }
        for (field, value) in [
            ("setpoint_s", self.setpoint_s),
            ("sample_interval_s", self.sample_interval_s),
            ("f_base_hz", self.f_base_hz),
            ("base_processing_ms", self.base_processing_ms),
            ("slo_window_s", self.slo_window_s),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.deadband_s < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "deadband_s",
                value: self.deadband_s,
            });
        }
        if self.slo_band_s < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "slo_band_s",
                value: self.slo_band_s,
            });
        }
        Ok(())
    }

    /// Manager scale bounds derived from this configuration.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::new(self.min_workers, self.max_workers)
    }

    /// Controller gains derived from this configuration.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            kp: self.kp,
            kd: self.kd,
            deadband_s: self.deadband_s,
        }
    }

    /// Which baseline arrival schedule to use.
    pub fn baseline_variant(&self) -> BaselineVariant {
        if self.legacy_jitter {
            BaselineVariant::UniformJitter
        } else {
            BaselineVariant::FixedInterval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SimConfig {
        SimConfig {
            setpoint_s: 1.0,
            sample_interval_s: 1.0,
            kp: 0.8,
            kd: 7.0,
            deadband_s: 0.0,
            min_workers: 1,
            max_workers: 5,
            f_base_hz: 2.0,
            base_processing_ms: 1000.0,
            legacy_jitter: false,
            slo_band_s: 0.2,
            slo_window_s: 60.0,
            workload_csv_path: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_zero_min_workers() {
        let mut config = base_config();
        config.min_workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::MinWorkersZero)));
    }

    #[test]
    fn rejects_max_below_min() {
        let mut config = base_config();
        config.max_workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::MaxBelowMin { .. })));
    }

    #[test]
    fn rejects_non_positive_setpoint() {
        let mut config = base_config();
        config.setpoint_s = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { field: "setpoint_s", .. })));
    }
}
