//! Event rates over the lifetime of a metric and over moving windows.

use std::time::Duration;

use parking_lot::Mutex;
use quanta::{Clock, Instant};

/// How often the moving averages are advanced.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

const TICK_SECS: f64 = 5.0;

/// Point-in-time rates for a metered metric, in events per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rates {
    /// Number of events ever recorded.
    pub count: u64,
    /// Average rate since the metric was created.
    pub mean: f64,
    /// One-minute exponentially-weighted moving average.
    pub m1: f64,
    /// Five-minute exponentially-weighted moving average.
    pub m5: f64,
    /// Fifteen-minute exponentially-weighted moving average.
    pub m15: f64,
}

struct Ewma {
    alpha: f64,
    rate: f64,
    primed: bool,
}

impl Ewma {
    fn new(minutes: f64) -> Ewma {
        Ewma { alpha: 1.0 - (-TICK_SECS / 60.0 / minutes).exp(), rate: 0.0, primed: false }
    }

    fn tick(&mut self, events: u64) {
        let instant = events as f64 / TICK_SECS;
        if self.primed {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.primed = true;
        }
    }

    // Applies `ticks` intervals in which nothing happened.
    fn idle(&mut self, ticks: u64) {
        if ticks == 0 {
            return;
        }
        if !self.primed {
            self.tick(0);
            return;
        }
        let ticks = i32::try_from(ticks).unwrap_or(i32::MAX);
        self.rate *= (1.0 - self.alpha).powi(ticks);
    }
}

struct State {
    count: u64,
    uncounted: u64,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

/// Measures the rate at which events occur.
///
/// Moving averages are advanced lazily, every [`TICK_INTERVAL`], whenever the meter is marked or
/// read, so an idle meter costs nothing.
pub struct Meter {
    state: Mutex<State>,
    clock: Clock,
    start: Instant,
}

impl Meter {
    /// Creates a new `Meter` using the given clock.
    pub fn new(clock: Clock) -> Meter {
        let start = clock.now();
        Meter {
            state: Mutex::new(State {
                count: 0,
                uncounted: 0,
                last_tick: start,
                m1: Ewma::new(1.0),
                m5: Ewma::new(5.0),
                m15: Ewma::new(15.0),
            }),
            clock,
            start,
        }
    }

    /// Records `n` events.
    pub fn mark(&self, n: u64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        advance(&mut state, now);
        state.count = state.count.saturating_add(n);
        state.uncounted = state.uncounted.saturating_add(n);
    }

    /// Gets the number of events ever recorded.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Gets the current rates.
    pub fn rates(&self) -> Rates {
        let now = self.clock.now();
        let mut state = self.state.lock();
        advance(&mut state, now);

        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let mean = if elapsed > 0.0 { state.count as f64 / elapsed } else { 0.0 };

        Rates {
            count: state.count,
            mean,
            m1: state.m1.rate,
            m5: state.m5.rate,
            m15: state.m15.rate,
        }
    }
}

fn advance(state: &mut State, now: Instant) {
    let elapsed = now.saturating_duration_since(state.last_tick);
    let ticks = u64::try_from(elapsed.as_nanos() / TICK_INTERVAL.as_nanos()).unwrap_or(u64::MAX);
    if ticks == 0 {
        return;
    }

    let step = Duration::from_nanos(ticks.saturating_mul(TICK_INTERVAL.as_nanos() as u64));
    state.last_tick = state.last_tick + step;

    // Events recorded since the last tick all belong to the first pending interval.
    let events = std::mem::take(&mut state.uncounted);
    for ewma in [&mut state.m1, &mut state.m5, &mut state.m15] {
        ewma.tick(events);
        ewma.idle(ticks - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Meter, TICK_INTERVAL};
    use approx::assert_relative_eq;
    use quanta::Clock;
    use std::time::Duration;

    #[test]
    fn test_mean_rate() {
        let (clock, mock) = Clock::mock();
        let meter = Meter::new(clock);
        assert_eq!(meter.rates().mean, 0.0);

        meter.mark(10);
        mock.increment(Duration::from_secs(4));

        let rates = meter.rates();
        assert_eq!(rates.count, 10);
        assert_relative_eq!(rates.mean, 2.5);

        // Nothing has been ticked yet.
        assert_eq!(rates.m1, 0.0);
    }

    #[test]
    fn test_first_tick_sets_rate() {
        let (clock, mock) = Clock::mock();
        let meter = Meter::new(clock);

        meter.mark(300);
        mock.increment(TICK_INTERVAL);

        let rates = meter.rates();
        assert_relative_eq!(rates.m1, 60.0);
        assert_relative_eq!(rates.m5, 60.0);
        assert_relative_eq!(rates.m15, 60.0);
    }

    #[test]
    fn test_idle_decay() {
        let (clock, mock) = Clock::mock();
        let meter = Meter::new(clock);

        meter.mark(300);
        mock.increment(TICK_INTERVAL);
        assert_relative_eq!(meter.rates().m1, 60.0);

        // A minute of silence decays the one-minute average by a factor of e.
        mock.increment(Duration::from_secs(60));
        let rates = meter.rates();
        assert_relative_eq!(rates.m1, 60.0 * (-1.0f64).exp(), epsilon = 1e-9);
        assert_relative_eq!(rates.m5, 60.0 * (-0.2f64).exp(), epsilon = 1e-9);
        assert!(rates.m15 > rates.m5);
        assert_eq!(rates.count, 300);
    }

    #[test]
    fn test_events_land_in_their_interval() {
        let (clock, mock) = Clock::mock();
        let meter = Meter::new(clock);

        mock.increment(TICK_INTERVAL);
        meter.mark(50);
        mock.increment(TICK_INTERVAL);

        // The first interval was empty, the second saw 50 events.
        let alpha = 1.0 - (-5.0f64 / 60.0).exp();
        assert_relative_eq!(meter.rates().m1, alpha * 10.0, epsilon = 1e-9);
    }
}
