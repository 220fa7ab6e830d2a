use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::{
    distribution::Distribution,
    storage::{ExpDecaySample, Rates, TimerSample},
};

/// A counter.
///
/// Counts events monotonically. Cloning a counter yields a handle to the same underlying value.
#[derive(Clone, Default)]
pub struct Counter {
    inner: Option<Arc<AtomicU64>>,
}

/// A timer.
///
/// Records durations into a decaying sample, in nanoseconds, and meters how often they occur.
#[derive(Clone, Default)]
pub struct Timer {
    inner: Option<Arc<TimerSample>>,
}

/// A histogram.
///
/// Records arbitrary values, such as bid prices, into a decaying sample.
#[derive(Clone, Default)]
pub struct Histogram {
    inner: Option<Arc<ExpDecaySample>>,
}

impl Counter {
    /// Creates a no-op `Counter` which does nothing.
    ///
    /// Suitable when a handle must be provided that does nothing i.e. an adapter that was never
    /// configured.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(a: Arc<AtomicU64>) -> Self {
        Self { inner: Some(a) }
    }

    /// Increments the counter.
    pub fn increment(&self, value: u64) {
        if let Some(ref inner) = self.inner {
            inner.fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Gets the current value of the counter.
    ///
    /// No-op counters always report zero.
    pub fn value(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.load(Ordering::Relaxed))
    }

    /// Returns `true` if this counter does nothing.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns `true` if both handles point to the same underlying counter.
    ///
    /// No-op counters are never equal to anything.
    pub fn ptr_eq(&self, other: &Counter) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Timer {
    /// Creates a no-op `Timer` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(a: Arc<TimerSample>) -> Self {
        Self { inner: Some(a) }
    }

    /// Records a duration.
    pub fn update(&self, duration: Duration) {
        if let Some(ref inner) = self.inner {
            inner.update(duration);
        }
    }

    /// Records the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Gets the number of durations ever recorded.
    pub fn count(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.count())
    }

    /// Takes a point-in-time snapshot of the recorded durations, in nanoseconds.
    pub fn snapshot(&self) -> Distribution {
        self.inner.as_ref().map_or_else(Distribution::empty, |inner| inner.snapshot())
    }

    /// Gets the rates at which durations are being recorded.
    ///
    /// No-op timers always report zero.
    pub fn rates(&self) -> Rates {
        self.inner.as_ref().map_or_else(Rates::default, |inner| inner.rates())
    }

    /// Returns `true` if this timer does nothing.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns `true` if both handles point to the same underlying timer.
    pub fn ptr_eq(&self, other: &Timer) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Histogram {
    /// Creates a no-op `Histogram` which does nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_arc(a: Arc<ExpDecaySample>) -> Self {
        Self { inner: Some(a) }
    }

    /// Records a value in the histogram.
    pub fn update(&self, value: i64) {
        if let Some(ref inner) = self.inner {
            inner.update(value);
        }
    }

    /// Gets the number of values ever recorded.
    pub fn count(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.count())
    }

    /// Takes a point-in-time snapshot of the recorded values.
    pub fn snapshot(&self) -> Distribution {
        self.inner.as_ref().map_or_else(Distribution::empty, |inner| inner.snapshot())
    }

    /// Returns `true` if this histogram does nothing.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns `true` if both handles point to the same underlying histogram.
    pub fn ptr_eq(&self, other: &Histogram) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter").field("value", &self.value()).finish()
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("count", &self.count()).finish()
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram").field("count", &self.count()).finish()
    }
}
