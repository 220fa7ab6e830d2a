//! An exponentially-decaying sampling reservoir.

use std::{cell::RefCell, cmp::Reverse, collections::BinaryHeap, mem, time::Duration};

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use quanta::{Clock, Instant};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::distribution::Distribution;

thread_local! {
    static FAST_RNG: RefCell<Xoshiro256StarStar> =
        RefCell::new(Xoshiro256StarStar::from_rng(&mut rand::rng()));
}

/// Draws a uniformly-distributed value in `(0.0, 1.0]`.
fn fastrand_unit() -> f64 {
    FAST_RNG.with(|rng| 1.0 - rng.borrow_mut().random::<f64>())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Weighted {
    // Natural log of the forward-decay priority.
    priority: OrderedFloat<f64>,
    value: i64,
}

struct State {
    // Min-heap on priority: the root is the next value to be evicted.
    values: BinaryHeap<Reverse<Weighted>>,
    count: u64,
    landmark: f64,
    next_rescale: f64,
}

/// An exponentially-decaying sampling reservoir.
///
/// Holds a fixed-size, statistically representative sample of a stream of values, biased towards
/// recently-recorded values. Based on the forward decay priority sampling described by Cormode et
/// al. in ["Forward Decay: A Practical Time Decay Model for Streaming Systems"][forward_decay]:
/// each value is assigned a priority of `exp(alpha * age) / u`, where `age` is the number of
/// seconds since the sample's landmark and `u` is uniformly distributed in `(0, 1]`. Only the
/// values with the highest priorities are retained.
///
/// Priorities are kept as their natural logarithm, `alpha * age - ln(u)`, which orders values the
/// same way but cannot overflow. The landmark is still moved forward periodically, shifting every
/// priority down by the same amount so that they keep their precision.
///
/// Updates take a short-lived lock, and draw their randomness from a fast, thread-local PRNG
/// ([Xoshiro256**][xoshiro256starstar]) to limit the per-call overhead.
///
/// [forward_decay]: http://dimacs.rutgers.edu/~graham/pubs/papers/fwddecay.pdf
/// [xoshiro256starstar]: https://prng.di.unimi.it
pub struct ExpDecaySample {
    state: Mutex<State>,
    reservoir_size: usize,
    alpha: f64,
    rescale_threshold: f64,
    clock: Clock,
    origin: Instant,
}

impl ExpDecaySample {
    /// Creates a new `ExpDecaySample`.
    ///
    /// `reservoir_size` is the maximum number of values held, `alpha` controls how strongly the
    /// sample is biased towards recent values, and `rescale_threshold` controls how often the
    /// landmark is moved forward.
    pub fn new(
        reservoir_size: usize,
        alpha: f64,
        rescale_threshold: Duration,
        clock: Clock,
    ) -> ExpDecaySample {
        let rescale_threshold = rescale_threshold.as_secs_f64();
        let origin = clock.now();

        ExpDecaySample {
            state: Mutex::new(State {
                values: BinaryHeap::with_capacity(reservoir_size),
                count: 0,
                landmark: 0.0,
                next_rescale: rescale_threshold,
            }),
            reservoir_size,
            alpha,
            rescale_threshold,
            clock,
            origin,
        }
    }

    /// Records a value into the sample.
    pub fn update(&self, value: i64) {
        let now = self.elapsed_secs();
        let u = fastrand_unit();

        let mut state = self.state.lock();
        state.count += 1;

        if now >= state.next_rescale {
            self.rescale(&mut state, now);
        }

        let priority = OrderedFloat(self.alpha * (now - state.landmark) - u.ln());
        if state.values.len() < self.reservoir_size {
            state.values.push(Reverse(Weighted { priority, value }));
        } else if state.values.peek().is_some_and(|Reverse(lowest)| priority > lowest.priority) {
            let _ = state.values.pop();
            state.values.push(Reverse(Weighted { priority, value }));
        }
    }

    /// Records a duration into the sample, in nanoseconds.
    ///
    /// Durations too large to be represented are saturated.
    pub fn update_duration(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.update(nanos);
    }

    /// Gets the number of values ever recorded into the sample.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Gets the number of values currently held by the sample.
    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    /// Returns `true` if the sample holds no values.
    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    /// Takes a point-in-time snapshot of the sample.
    pub fn snapshot(&self) -> Distribution {
        let state = self.state.lock();
        let values = state.values.iter().map(|Reverse(w)| w.value).collect();
        Distribution::new(state.count, values)
    }

    fn elapsed_secs(&self) -> f64 {
        self.clock.now().saturating_duration_since(self.origin).as_secs_f64()
    }

    fn rescale(&self, state: &mut State, now: f64) {
        let shift = self.alpha * (now - state.landmark);
        state.landmark = now;
        state.next_rescale = now + self.rescale_threshold;

        let values = mem::take(&mut state.values);
        state.values = values
            .into_iter()
            .map(|Reverse(w)| {
                Reverse(Weighted { priority: OrderedFloat(w.priority.0 - shift), value: w.value })
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::ExpDecaySample;
    use quanta::Clock;
    use std::{cmp::Reverse, time::Duration};

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_holds_everything_below_capacity() {
        let sample = ExpDecaySample::new(100, 0.015, HOUR, Clock::new());
        for i in 0..10 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 10);
        assert_eq!(sample.len(), 10);

        let snapshot = sample.snapshot();
        assert_eq!(snapshot.values(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_bounded_by_reservoir_size() {
        let sample = ExpDecaySample::new(100, 0.015, HOUR, Clock::new());
        for i in 0..1000 {
            sample.update(i);
        }

        assert_eq!(sample.count(), 1000);
        assert_eq!(sample.len(), 100);

        let snapshot = sample.snapshot();
        assert_eq!(snapshot.count(), 1000);
        assert_eq!(snapshot.sample_len(), 100);
        assert!(snapshot.values().iter().all(|v| (0..1000).contains(v)));
    }

    #[test]
    fn test_favors_recent_values() {
        let (clock, mock) = Clock::mock();
        let sample = ExpDecaySample::new(10, 0.015, HOUR, clock);

        for _ in 0..10 {
            sample.update(1);
        }

        // Ten minutes later, new values outweigh the old ones by a factor of roughly 8000.
        mock.increment(Duration::from_secs(600));
        for _ in 0..10 {
            sample.update(2);
        }

        let snapshot = sample.snapshot();
        let recent = snapshot.values().iter().filter(|v| **v == 2).count();
        assert_eq!(snapshot.count(), 20);
        assert!(recent >= 9, "expected recent values to dominate, got {:?}", snapshot.values());
    }

    #[test]
    fn test_rescale_keeps_priorities_finite() {
        let (clock, mock) = Clock::mock();
        let sample = ExpDecaySample::new(50, 0.015, HOUR, clock);

        for hour in 0..48 {
            for i in 0..20 {
                sample.update(hour * 100 + i);
            }
            mock.increment(HOUR + Duration::from_secs(1));
        }

        let state = sample.state.lock();
        assert_eq!(state.count, 48 * 20);
        assert_eq!(state.values.len(), 50);
        assert!(state.landmark > 0.0);
        assert!(state.values.iter().all(|Reverse(w)| w.priority.0.is_finite()));
    }

    #[test]
    fn test_steep_decay_keeps_accepting_values() {
        let (clock, mock) = Clock::mock();
        let sample = ExpDecaySample::new(2, 1.0, HOUR, clock);

        mock.increment(Duration::from_secs(1000));
        sample.update(1);
        sample.update(2);

        // Past the rescale threshold, with `alpha * age` far beyond what `exp` can represent.
        mock.increment(Duration::from_secs(3000));
        sample.update(3);
        sample.update(4);

        assert_eq!(sample.snapshot().values(), &[3, 4]);

        let state = sample.state.lock();
        assert!(state.values.iter().all(|Reverse(w)| w.priority.0.is_finite()));
    }

    #[test]
    fn test_update_duration() {
        let sample = ExpDecaySample::new(10, 0.015, HOUR, Clock::new());
        sample.update_duration(Duration::from_micros(250));
        sample.update_duration(Duration::MAX);

        let snapshot = sample.snapshot();
        assert_eq!(snapshot.values(), &[250_000, i64::MAX]);
    }
}
