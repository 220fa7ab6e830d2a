use std::time::Duration;

use super::{ExpDecaySample, Meter, Rates};
use crate::distribution::Distribution;

/// Backing storage for a timer: a decaying sample of durations, plus the rate at which they are
/// recorded.
pub struct TimerSample {
    sample: ExpDecaySample,
    meter: Meter,
}

impl TimerSample {
    /// Creates a new `TimerSample`.
    pub fn new(sample: ExpDecaySample, meter: Meter) -> TimerSample {
        TimerSample { sample, meter }
    }

    /// Records a duration, in nanoseconds.
    pub fn update(&self, duration: Duration) {
        self.sample.update_duration(duration);
        self.meter.mark(1);
    }

    /// Gets the number of durations ever recorded.
    pub fn count(&self) -> u64 {
        self.sample.count()
    }

    /// Takes a point-in-time snapshot of the sampled durations.
    pub fn snapshot(&self) -> Distribution {
        self.sample.snapshot()
    }

    /// Gets the rates at which durations are being recorded.
    pub fn rates(&self) -> Rates {
        self.meter.rates()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerSample;
    use crate::storage::{ExpDecaySample, Meter, TICK_INTERVAL};
    use approx::assert_relative_eq;
    use quanta::Clock;
    use std::time::Duration;

    #[test]
    fn test_update_feeds_sample_and_meter() {
        let (clock, mock) = Clock::mock();
        let timer = TimerSample::new(
            ExpDecaySample::new(16, 0.015, Duration::from_secs(3600), clock.clone()),
            Meter::new(clock),
        );

        for ms in [5, 10, 15] {
            timer.update(Duration::from_millis(ms));
        }
        mock.increment(TICK_INTERVAL);

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.snapshot().values(), &[5_000_000, 10_000_000, 15_000_000]);

        let rates = timer.rates();
        assert_eq!(rates.count, 3);
        assert_relative_eq!(rates.mean, 0.6);
        assert_relative_eq!(rates.m1, 0.6);
    }
}
