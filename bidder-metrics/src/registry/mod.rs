//! Named storage for every metric primitive.
use std::{
    fmt,
    hash::BuildHasher,
    iter::repeat,
    sync::{atomic::AtomicU64, Arc, PoisonError, RwLock},
};

use hashbrown::{DefaultHashBuilder, HashMap};

use crate::{
    kind::MetricKind,
    names::Prefix,
    storage::{AtomicStorage, ExpDecaySample, TimerSample},
};

type RegistryHashMap<V> = HashMap<String, V>;
type Shards<V> = Vec<RwLock<RegistryHashMap<V>>>;

/// A metric registry.
///
/// `Registry` maintains a central listing of counters, timers, and histograms mapped by their full
/// dotted name. A name is registered at most once per kind for the lifetime of the registry:
/// concurrent callers asking for the same name always observe the same instance.
///
/// Metrics are never removed. If a prefix is configured, it is applied to every name on the way in,
/// so lookups take the unprefixed name while visitors see the full, prefixed name.
///
/// ## Performance
///
/// `Registry` is optimized for reads. Each kind is split into a power-of-two number of subshards,
/// and lookups take a shared lock on a single subshard, only falling back to an exclusive lock when
/// the name has not been seen before.
pub struct Registry {
    counters: Shards<Arc<AtomicU64>>,
    timers: Shards<Arc<TimerSample>>,
    histograms: Shards<Arc<ExpDecaySample>>,
    shard_mask: usize,
    hasher: DefaultHashBuilder,
    prefix: Prefix,
    storage: AtomicStorage,
}

fn shards<V>(count: usize) -> Shards<V> {
    repeat(()).take(count).map(|_| RwLock::new(RegistryHashMap::default())).collect()
}

impl Registry {
    /// Creates a new `Registry`.
    pub fn new(storage: AtomicStorage, prefix: Prefix) -> Self {
        let shard_count = std::cmp::max(1, num_cpus::get()).next_power_of_two();
        let shard_mask = shard_count - 1;

        Self {
            counters: shards(shard_count),
            timers: shards(shard_count),
            histograms: shards(shard_count),
            shard_mask,
            hasher: DefaultHashBuilder::default(),
            prefix,
            storage,
        }
    }

    /// Gets the prefix applied to every name.
    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// Gets the storage used to create new metrics.
    pub fn storage(&self) -> &AtomicStorage {
        &self.storage
    }

    /// Gets or creates the given counter.
    ///
    /// The `op` function is passed a reference to the counter, whether it already existed or was
    /// just created, and its return value is passed back to the caller.
    pub fn get_or_create_counter<O, V>(&self, name: &str, op: O) -> V
    where
        O: FnOnce(&Arc<AtomicU64>) -> V,
    {
        self.get_or_create(&self.counters, name, || self.storage.counter(), op)
    }

    /// Gets or creates the given timer.
    ///
    /// The `op` function is passed a reference to the timer, whether it already existed or was
    /// just created, and its return value is passed back to the caller.
    pub fn get_or_create_timer<O, V>(&self, name: &str, op: O) -> V
    where
        O: FnOnce(&Arc<TimerSample>) -> V,
    {
        self.get_or_create(&self.timers, name, || self.storage.timer(), op)
    }

    /// Gets or creates the given histogram.
    ///
    /// The `op` function is passed a reference to the histogram, whether it already existed or was
    /// just created, and its return value is passed back to the caller.
    pub fn get_or_create_histogram<O, V>(&self, name: &str, op: O) -> V
    where
        O: FnOnce(&Arc<ExpDecaySample>) -> V,
    {
        self.get_or_create(&self.histograms, name, || self.storage.histogram(), op)
    }

    /// Gets a copy of an existing counter.
    pub fn get_counter(&self, name: &str) -> Option<Arc<AtomicU64>> {
        self.get(&self.counters, name)
    }

    /// Gets a copy of an existing timer.
    pub fn get_timer(&self, name: &str) -> Option<Arc<TimerSample>> {
        self.get(&self.timers, name)
    }

    /// Gets a copy of an existing histogram.
    pub fn get_histogram(&self, name: &str) -> Option<Arc<ExpDecaySample>> {
        self.get(&self.histograms, name)
    }

    /// Visits every counter stored in this registry.
    ///
    /// This operation does not lock the entire registry, but proceeds directly through the
    /// subshards that are kept internally. A metric that is added after the call to
    /// `visit_counters`, but before it finishes, may not be observed.
    pub fn visit_counters<F>(&self, collect: F)
    where
        F: FnMut(&str, &Arc<AtomicU64>),
    {
        visit(&self.counters, collect);
    }

    /// Visits every timer stored in this registry.
    ///
    /// Consistency is the same as for [`visit_counters`][Registry::visit_counters].
    pub fn visit_timers<F>(&self, collect: F)
    where
        F: FnMut(&str, &Arc<TimerSample>),
    {
        visit(&self.timers, collect);
    }

    /// Visits every histogram stored in this registry.
    ///
    /// Consistency is the same as for [`visit_counters`][Registry::visit_counters].
    pub fn visit_histograms<F>(&self, collect: F)
    where
        F: FnMut(&str, &Arc<ExpDecaySample>),
    {
        visit(&self.histograms, collect);
    }

    /// Gets the number of metrics of the given kind.
    pub fn len(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::Counter => count(&self.counters),
            MetricKind::Timer => count(&self.timers),
            MetricKind::Histogram => count(&self.histograms),
        }
    }

    /// Returns `true` if no metrics of any kind have been registered.
    pub fn is_empty(&self) -> bool {
        [MetricKind::Counter, MetricKind::Timer, MetricKind::Histogram]
            .into_iter()
            .all(|kind| self.len(kind) == 0)
    }

    fn shard<'a, V>(&self, shards: &'a Shards<V>, name: &str) -> &'a RwLock<RegistryHashMap<V>> {
        let hash = self.hasher.hash_one(name);
        &shards[hash as usize & self.shard_mask]
    }

    fn get<V: Clone>(&self, shards: &Shards<V>, name: &str) -> Option<V> {
        let name = self.prefix.apply(name);
        let shard = self.shard(shards, &name);
        let shard_read = shard.read().unwrap_or_else(PoisonError::into_inner);
        shard_read.get(&*name).cloned()
    }

    fn get_or_create<T, C, O, V>(&self, shards: &Shards<T>, name: &str, create: C, op: O) -> V
    where
        C: FnOnce() -> T,
        O: FnOnce(&T) -> V,
    {
        let name = self.prefix.apply(name);
        let shard = self.shard(shards, &name);

        // Try and get the handle if it exists, running our operation if we succeed.
        let shard_read = shard.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(v) = shard_read.get(&*name) {
            op(v)
        } else {
            // Switch to write guard and insert the handle first.
            drop(shard_read);
            let mut shard_write = shard.write().unwrap_or_else(PoisonError::into_inner);
            let v = shard_write.entry_ref(&*name).or_insert_with(create);
            op(v)
        }
    }
}

fn visit<V, F>(shards: &Shards<V>, mut collect: F)
where
    F: FnMut(&str, &V),
{
    for subshard in shards.iter() {
        let shard_read = subshard.read().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in shard_read.iter() {
            collect(name, value);
        }
    }
}

fn count<V>(shards: &Shards<V>) -> usize {
    shards.iter().map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len()).sum()
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(AtomicStorage::default(), Prefix::none())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("prefix", &self.prefix)
            .field("counters", &self.len(MetricKind::Counter))
            .field("timers", &self.len(MetricKind::Timer))
            .field("histograms", &self.len(MetricKind::Histogram))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::{kind::MetricKind, names::Prefix, storage::AtomicStorage};
    use std::{
        sync::{atomic::Ordering, Arc, Barrier},
        time::Duration,
    };

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = Registry::default();
        assert!(registry.is_empty());

        let first = registry.get_or_create_counter("requests", |c| c.clone());
        first.fetch_add(3, Ordering::Relaxed);

        let second = registry.get_or_create_counter("requests", |c| c.clone());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.load(Ordering::Relaxed), 3);
        assert_eq!(registry.len(MetricKind::Counter), 1);

        // Kinds have separate namespaces.
        let timer = registry.get_or_create_timer("requests", |t| t.clone());
        timer.update(Duration::from_nanos(10));
        assert_eq!(registry.len(MetricKind::Timer), 1);
        assert_eq!(registry.len(MetricKind::Histogram), 0);
        assert!(registry.get_histogram("requests").is_none());
    }

    #[test]
    fn test_concurrent_creation_yields_one_instance() {
        const CALLERS: usize = 32;

        let registry = Registry::default();
        let barrier = Barrier::new(CALLERS);

        let handles = std::thread::scope(|s| {
            let tasks = (0..CALLERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        registry.get_or_create_histogram("account.pub1.prices", |h| h.clone())
                    })
                })
                .collect::<Vec<_>>();

            tasks.into_iter().map(|t| t.join().expect("caller panicked")).collect::<Vec<_>>()
        });

        assert_eq!(handles.len(), CALLERS);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert_eq!(registry.len(MetricKind::Histogram), 1);
    }

    #[test]
    fn test_prefix_is_applied() {
        let registry = Registry::new(AtomicStorage::default(), Prefix::new("bidder"));
        registry.get_or_create_counter("adapter.appnexus.requests", |c| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        let counter = registry.get_counter("adapter.appnexus.requests").expect("missing counter");
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        let mut names = Vec::new();
        registry.visit_counters(|name, _| names.push(name.to_string()));
        assert_eq!(names, vec!["bidder.adapter.appnexus.requests"]);
    }

    #[test]
    fn test_visit() {
        let registry = Registry::default();
        for name in ["a", "b", "c"] {
            registry.get_or_create_counter(name, |_| ());
            registry.get_or_create_timer(name, |_| ());
        }
        registry.get_or_create_histogram("d", |_| ());

        let mut counters = Vec::new();
        registry.visit_counters(|name, _| counters.push(name.to_string()));
        counters.sort();
        assert_eq!(counters, vec!["a", "b", "c"]);

        let mut timers = 0;
        registry.visit_timers(|_, _| timers += 1);
        assert_eq!(timers, 3);

        let mut histograms = Vec::new();
        registry.visit_histograms(|name, _| histograms.push(name.to_string()));
        assert_eq!(histograms, vec!["d"]);
    }
}
