//! Storage for the metric primitives held by the registry.
use std::{
    sync::{atomic::AtomicU64, Arc},
    time::Duration,
};

use quanta::Clock;
use serde::Deserialize;

use crate::error::Error;

mod meter;
pub use meter::{Meter, Rates, TICK_INTERVAL};

mod sample;
pub use sample::ExpDecaySample;

mod timer;
pub use timer::TimerSample;

/// Sampling configuration for timers and histograms.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Maximum number of values held by each reservoir.
    ///
    /// Defaults to 1028.
    pub reservoir_size: usize,

    /// Exponential decay factor.
    ///
    /// Higher values bias the sample more heavily towards recent values. Defaults to 0.015.
    pub alpha: f64,

    /// How often, in seconds, the decay landmark is moved forward.
    ///
    /// Defaults to one hour.
    pub rescale_threshold_secs: u64,
}

impl SampleConfig {
    /// Checks that the configuration describes a usable reservoir.
    ///
    /// # Errors
    ///
    /// If the reservoir size or rescale threshold is zero, or the decay factor is not a positive,
    /// finite number small enough to be applied over a whole rescale period, an error variant
    /// will be returned describing the issue.
    pub fn validate(&self) -> Result<(), Error> {
        if self.reservoir_size == 0 {
            return Err(Error::InvalidSample {
                reason: "reservoir size must be greater than zero".to_string(),
            });
        }

        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(Error::InvalidSample {
                reason: format!("alpha must be a positive, finite number (got {})", self.alpha),
            });
        }

        if self.rescale_threshold_secs == 0 {
            return Err(Error::InvalidSample {
                reason: "rescale threshold must be greater than zero".to_string(),
            });
        }

        if !(self.alpha * self.rescale_threshold_secs as f64).is_finite() {
            return Err(Error::InvalidSample {
                reason: format!(
                    "alpha {} is too large for a rescale threshold of {}s",
                    self.alpha, self.rescale_threshold_secs
                ),
            });
        }

        Ok(())
    }

    /// Gets the rescale threshold as a [`Duration`].
    pub fn rescale_threshold(&self) -> Duration {
        Duration::from_secs(self.rescale_threshold_secs)
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        SampleConfig { reservoir_size: 1028, alpha: 0.015, rescale_threshold_secs: 3600 }
    }
}

/// Creates the backing storage for counters, timers, and histograms.
///
/// Counters are plain atomics. Histograms are [`ExpDecaySample`] reservoirs, and timers pair one
/// with a [`Meter`]. All of them share the same sampling configuration and clock.
#[derive(Clone, Debug)]
pub struct AtomicStorage {
    sample: SampleConfig,
    clock: Clock,
}

impl AtomicStorage {
    /// Creates a new `AtomicStorage` with the given sampling configuration.
    ///
    /// # Errors
    ///
    /// If the sampling configuration is invalid, an error variant will be returned describing the
    /// issue.
    pub fn new(sample: SampleConfig) -> Result<Self, Error> {
        Self::with_clock(sample, Clock::new())
    }

    /// Creates a new `AtomicStorage` with the given sampling configuration and clock.
    ///
    /// # Errors
    ///
    /// If the sampling configuration is invalid, an error variant will be returned describing the
    /// issue.
    pub fn with_clock(sample: SampleConfig, clock: Clock) -> Result<Self, Error> {
        sample.validate()?;
        Ok(AtomicStorage { sample, clock })
    }

    /// Gets the sampling configuration.
    pub fn sample_config(&self) -> &SampleConfig {
        &self.sample
    }

    pub(crate) fn counter(&self) -> Arc<AtomicU64> {
        Arc::new(AtomicU64::new(0))
    }

    pub(crate) fn timer(&self) -> Arc<TimerSample> {
        Arc::new(TimerSample::new(self.sample(), Meter::new(self.clock.clone())))
    }

    pub(crate) fn histogram(&self) -> Arc<ExpDecaySample> {
        Arc::new(self.sample())
    }

    fn sample(&self) -> ExpDecaySample {
        ExpDecaySample::new(
            self.sample.reservoir_size,
            self.sample.alpha,
            self.sample.rescale_threshold(),
            self.clock.clone(),
        )
    }
}

impl Default for AtomicStorage {
    fn default() -> Self {
        AtomicStorage { sample: SampleConfig::default(), clock: Clock::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::{AtomicStorage, SampleConfig};
    use crate::error::Error;
    use std::{
        sync::{atomic::Ordering, Arc},
        time::Duration,
    };

    #[test]
    fn test_default_config_is_valid() {
        let config = SampleConfig::default();
        assert_eq!(config.reservoir_size, 1028);
        assert_eq!(config.alpha, 0.015);
        assert_eq!(config.rescale_threshold_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let configs = [
            SampleConfig { reservoir_size: 0, ..Default::default() },
            SampleConfig { alpha: 0.0, ..Default::default() },
            SampleConfig { alpha: -1.0, ..Default::default() },
            SampleConfig { alpha: f64::NAN, ..Default::default() },
            SampleConfig { rescale_threshold_secs: 0, ..Default::default() },
            SampleConfig { alpha: f64::MAX, ..Default::default() },
        ];

        for config in configs {
            let result = AtomicStorage::new(config.clone());
            assert!(
                matches!(result, Err(Error::InvalidSample { .. })),
                "expected {config:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_primitives_are_distinct() {
        let storage = AtomicStorage::default();

        let a = storage.counter();
        let b = storage.counter();
        a.fetch_add(1, Ordering::Relaxed);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.load(Ordering::Relaxed), 0);

        let t = storage.timer();
        let h = storage.histogram();
        t.update(Duration::from_nanos(1));
        assert_eq!(t.count(), 1);
        assert_eq!(h.count(), 0);
        assert!(!Arc::ptr_eq(&h, &storage.histogram()));
    }
}
