use std::sync::atomic::Ordering;

use crate::{distribution::Distribution, kind::MetricKind, registry::Registry, storage::Rates};

/// A point-in-time value for a metric.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotValue {
    /// Counter.
    Counter(u64),
    /// Timer: sampled durations in nanoseconds, and the rates at which they were recorded.
    Timer(Distribution, Rates),
    /// Histogram.
    Histogram(Distribution),
}

impl SnapshotValue {
    /// Gets the kind of metric this value was read from.
    pub fn kind(&self) -> MetricKind {
        match self {
            SnapshotValue::Counter(_) => MetricKind::Counter,
            SnapshotValue::Timer(..) => MetricKind::Timer,
            SnapshotValue::Histogram(_) => MetricKind::Histogram,
        }
    }

    /// Gets the counter value, if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            SnapshotValue::Counter(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets the recording rates, if this is a timer.
    pub fn as_rates(&self) -> Option<&Rates> {
        match self {
            SnapshotValue::Timer(_, rates) => Some(rates),
            _ => None,
        }
    }

    /// Gets the distribution, if this is a timer or histogram.
    pub fn as_distribution(&self) -> Option<&Distribution> {
        match self {
            SnapshotValue::Counter(_) => None,
            SnapshotValue::Timer(dist, _) | SnapshotValue::Histogram(dist) => Some(dist),
        }
    }
}

/// A point-in-time view of every metric in a registry, ordered by name.
///
/// Taking a snapshot does not stop the world: values recorded while it is being taken may or may
/// not be included.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(String, SnapshotValue)>,
}

impl Snapshot {
    /// Takes a snapshot of the given registry.
    pub fn collect(registry: &Registry) -> Snapshot {
        let mut entries = Vec::new();

        registry.visit_counters(|name, counter| {
            let value = counter.load(Ordering::Relaxed);
            entries.push((name.to_string(), SnapshotValue::Counter(value)));
        });
        registry.visit_timers(|name, timer| {
            let value = SnapshotValue::Timer(timer.snapshot(), timer.rates());
            entries.push((name.to_string(), value));
        });
        registry.visit_histograms(|name, histogram| {
            entries.push((name.to_string(), SnapshotValue::Histogram(histogram.snapshot())));
        });

        entries.sort_by(|(a_name, a), (b_name, b)| {
            a_name.cmp(b_name).then_with(|| a.kind().cmp(&b.kind()))
        });

        Snapshot { entries }
    }

    /// Gets the value of the metric with the given name.
    ///
    /// If a name is registered as more than one kind, counters are returned first, then timers,
    /// then histograms.
    pub fn get(&self, name: &str) -> Option<&SnapshotValue> {
        let start = self.entries.partition_point(|(n, _)| n.as_str() < name);
        self.entries.get(start).filter(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Gets the value of the counter with the given name.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(SnapshotValue::as_counter)
    }

    /// Iterates over every metric, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Iterates over every metric name, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Gets the number of metrics in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, SnapshotValue);
    type IntoIter = std::vec::IntoIter<(String, SnapshotValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Snapshot, SnapshotValue};
    use crate::{kind::MetricKind, registry::Registry};
    use std::{sync::atomic::Ordering, time::Duration};

    #[test]
    fn test_empty() {
        let snapshot = Snapshot::collect(&Registry::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.get("requests"), None);
    }

    #[test]
    fn test_collect() {
        let registry = Registry::default();
        registry.get_or_create_counter("requests", |c| c.fetch_add(7, Ordering::Relaxed));
        registry.get_or_create_counter("app_requests", |c| c.fetch_add(1, Ordering::Relaxed));
        registry.get_or_create_timer("request_time", |t| t.update(Duration::from_micros(1)));
        registry.get_or_create_histogram("account.pub1.prices", |h| {
            h.update(10);
            h.update(20);
        });

        let snapshot = Snapshot::collect(&registry);
        assert_eq!(snapshot.len(), 4);
        assert_eq!(
            snapshot.names().collect::<Vec<_>>(),
            vec!["account.pub1.prices", "app_requests", "request_time", "requests"]
        );

        assert_eq!(snapshot.counter("requests"), Some(7));
        assert_eq!(snapshot.counter("request_time"), None);

        let timer = snapshot.get("request_time").expect("missing timer");
        assert_eq!(timer.kind(), MetricKind::Timer);
        assert_eq!(timer.as_distribution().map(|d| d.values()), Some(&[1_000][..]));
        assert_eq!(timer.as_rates().map(|r| r.count), Some(1));
        assert!(snapshot.get("requests").and_then(SnapshotValue::as_rates).is_none());

        match snapshot.get("account.pub1.prices") {
            Some(SnapshotValue::Histogram(dist)) => assert_eq!(dist.values(), &[10, 20]),
            other => panic!("expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_same_name_different_kinds() {
        let registry = Registry::default();
        registry.get_or_create_histogram("x", |_| ());
        registry.get_or_create_counter("x", |_| ());

        let snapshot = Snapshot::collect(&registry);
        let kinds = snapshot.iter().map(|(_, v)| v.kind()).collect::<Vec<_>>();
        assert_eq!(kinds, vec![MetricKind::Counter, MetricKind::Histogram]);
        assert_eq!(snapshot.get("x").map(SnapshotValue::kind), Some(MetricKind::Counter));
    }
}
