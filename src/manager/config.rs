//! Manager scale bounds (spec.md §3, "Manager configuration").

use std::sync::atomic::{AtomicUsize, Ordering};

/// Scale bounds for a [`super::Manager`].
///
/// `min_workers` is fixed for the manager's lifetime. `max_workers` is
/// mutable at runtime (the visualiser interface, spec.md §6) and is stored
/// as an atomic so reads from [`super::Manager::scale`] never block on a
/// lock held by a concurrent [`super::Manager::set_max_workers`] call.
#[derive(Debug)]
pub struct ManagerConfig {
    /// Lower bound on worker count, always >= 1.
    pub min_workers: usize,
    max_workers: AtomicUsize,
}

impl ManagerConfig {
    /// Creates a new configuration. Panics if `min_workers` is 0 or
    /// `max_workers < min_workers` — both are validated earlier, by
    /// [`crate::config::SimConfig::from_args`], before a `Manager` is ever
    /// constructed.
    pub fn new(min_workers: usize, max_workers: usize) -> Self {
        assert!(min_workers >= 1, "min_workers must be at least 1");
        assert!(
            max_workers >= min_workers,
            "max_workers must be >= min_workers"
        );
        Self {
            min_workers,
            max_workers: AtomicUsize::new(max_workers),
        }
    }

    /// Current upper bound on worker count.
    pub fn max_workers(&self) -> usize {
        self.max_workers.load(Ordering::Acquire)
    }

    /// Attempts to set a new upper bound.
    ///
    /// Returns `Err` (and leaves the bound unchanged) if `new_max` is below
    /// `min_workers` or below `current_worker_count` — spec.md §7, "Invalid
    /// input": the caller is expected to log a warning and keep the
    /// previous value.
    pub fn try_set_max_workers(&self, new_max: usize, current_worker_count: usize) -> Result<(), ()> {
        if new_max < self.min_workers || new_max < current_worker_count {
            return Err(());
        }
        self.max_workers.store(new_max, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_max_below_min() {
        let config = ManagerConfig::new(2, 5);
        assert!(config.try_set_max_workers(1, 2).is_err());
        assert_eq!(config.max_workers(), 5, "unchanged on rejection");
    }

    #[test]
    fn rejects_max_below_current_count() {
        let config = ManagerConfig::new(1, 10);
        assert!(config.try_set_max_workers(3, 4).is_err());
        assert_eq!(config.max_workers(), 10);
    }

    #[test]
    fn accepts_valid_increase() {
        let config = ManagerConfig::new(1, 5);
        assert!(config.try_set_max_workers(8, 5).is_ok());
        assert_eq!(config.max_workers(), 8);
    }
}
