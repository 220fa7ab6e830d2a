use std::{collections::HashMap, sync::Arc};

use crate::{
    adapter::AdapterMetrics,
    handles::{Counter, Histogram},
    names::{self, AdapterScope},
    registry::Registry,
};

/// Metrics for a single publisher account.
///
/// Holds the account-level counters, plus one [`AdapterMetrics`] per configured adapter, scoped to
/// this account. The nested adapter sets are all registered up front, when the account is first
/// seen.
#[derive(Debug)]
pub struct AccountMetrics {
    id: String,
    requests: Counter,
    bids_received: Counter,
    prices: Histogram,
    adapters: HashMap<String, Arc<AdapterMetrics>>,
    noop_adapter: Arc<AdapterMetrics>,
}

impl AccountMetrics {
    pub(crate) fn register<S: AsRef<str>>(
        registry: &Registry,
        id: &str,
        adapter_codes: &[S],
        noop_adapter: Arc<AdapterMetrics>,
    ) -> Self {
        let counter = |metric: &str| {
            registry.get_or_create_counter(&names::account_metric_name(id, metric), |c| {
                Counter::from_arc(c.clone())
            })
        };

        AccountMetrics {
            id: id.to_string(),
            requests: counter(names::REQUESTS),
            bids_received: counter(names::BIDS_RECEIVED),
            prices: registry
                .get_or_create_histogram(&names::account_metric_name(id, names::PRICES), |h| {
                    Histogram::from_arc(h.clone())
                }),
            adapters: AdapterMetrics::register_all(
                registry,
                AdapterScope::Account(id),
                adapter_codes,
            ),
            noop_adapter,
        }
    }

    /// Gets the account identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Counts requests made on behalf of this account.
    pub fn inc_request(&self, n: u64) {
        self.requests.increment(n);
    }

    /// Counts bids received for this account.
    pub fn inc_bids_received(&self, n: u64) {
        self.bids_received.increment(n);
    }

    /// Records a bid price for this account, in CPM.
    pub fn update_price_histogram(&self, cpm: i64) {
        self.prices.update(cpm);
    }

    /// Gets the metrics for the given adapter within this account.
    ///
    /// If the adapter was not configured, a no-op set is returned.
    pub fn adapter_metrics(&self, code: &str) -> Arc<AdapterMetrics> {
        match self.adapters.get(code) {
            Some(metrics) => Arc::clone(metrics),
            None => {
                tracing::trace!(account = %self.id, adapter = code, "unknown adapter code");
                Arc::clone(&self.noop_adapter)
            }
        }
    }

    /// Gets the number of adapter sets held by this account.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Gets the request counter.
    pub fn requests(&self) -> &Counter {
        &self.requests
    }

    /// Gets the received bids counter.
    pub fn bids_received(&self) -> &Counter {
        &self.bids_received
    }

    /// Gets the bid price histogram.
    pub fn prices(&self) -> &Histogram {
        &self.prices
    }
}

#[cfg(test)]
mod tests {
    use super::AccountMetrics;
    use crate::{adapter::AdapterMetrics, kind::MetricKind, registry::Registry};
    use std::sync::Arc;

    fn account(registry: &Registry, id: &str) -> AccountMetrics {
        let noop = Arc::new(AdapterMetrics::noop());
        AccountMetrics::register(registry, id, &["adapterA", "adapterB"], noop)
    }

    #[test]
    fn test_nested_adapters_are_eager() {
        let registry = Registry::default();
        let metrics = account(&registry, "pub1");

        assert_eq!(metrics.id(), "pub1");
        assert_eq!(metrics.adapter_count(), 2);

        // 2 account counters, plus 6 counters per nested adapter.
        assert_eq!(registry.len(MetricKind::Counter), 2 + 2 * 6);
        assert_eq!(registry.len(MetricKind::Timer), 2);
        assert_eq!(registry.len(MetricKind::Histogram), 3);
        assert!(registry.get_timer("account.pub1.adapter.adapterB.request_time").is_some());
    }

    #[test]
    fn test_operations() {
        let registry = Registry::default();
        let metrics = account(&registry, "pub1");

        metrics.inc_request(1);
        metrics.inc_bids_received(4);
        metrics.update_price_histogram(2100);
        metrics.adapter_metrics("adapterA").inc_bids_received(2);

        assert_eq!(metrics.requests().value(), 1);
        assert_eq!(metrics.bids_received().value(), 4);
        assert_eq!(metrics.prices().count(), 1);
        assert_eq!(metrics.adapter_metrics("adapterA").bids_received().value(), 2);
        assert_eq!(metrics.adapter_metrics("adapterB").bids_received().value(), 0);
    }

    #[test]
    fn test_unknown_adapter() {
        let registry = Registry::default();
        let metrics = account(&registry, "pub1");

        let unknown = metrics.adapter_metrics("unknown-code");
        assert!(unknown.is_noop());
        unknown.inc_request(1);
        unknown.inc_bids_received(1);
    }
}
