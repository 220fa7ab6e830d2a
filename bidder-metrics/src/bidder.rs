use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use parking_lot::RwLock;

use crate::{
    account::AccountMetrics,
    adapter::AdapterMetrics,
    config::MetricsConfig,
    error::Error,
    handles::{Counter, Timer},
    names::{self, AdapterScope},
    registry::Registry,
    sink::Sink,
    snapshot::Snapshot,
    storage::AtomicStorage,
    transaction::{TransactionLog, TransactionLogger},
};

/// Request metrics for a bidding server.
///
/// Owns the server-wide counters and request timer, one [`AdapterMetrics`] per configured adapter,
/// and the [`AccountMetrics`] of every account seen so far.
///
/// Adapter sets are registered up front and never change. Account sets are registered on first use
/// and then kept for the lifetime of the process: there is no eviction, so the number of tracked
/// accounts grows with the number of distinct account identifiers observed.
pub struct BidderMetrics {
    registry: Registry,
    sink: Sink,
    transactions: TransactionLog,
    adapter_codes: Vec<String>,

    requests: Counter,
    app_requests: Counter,
    no_cookie_requests: Counter,
    safari_requests: Counter,
    safari_no_cookie_requests: Counter,
    error_requests: Counter,
    invalid_requests: Counter,
    cookie_sync_requests: Counter,
    request_timer: Timer,

    adapters: HashMap<String, Arc<AdapterMetrics>>,
    noop_adapter: Arc<AdapterMetrics>,
    accounts: RwLock<HashMap<String, Arc<AccountMetrics>>>,
}

impl BidderMetrics {
    /// Creates a new `BidderMetrics` for the given adapters.
    ///
    /// The metrics backend is resolved from the configuration first: for InfluxDB, every name is
    /// registered with the configured prefix.
    ///
    /// # Errors
    ///
    /// If the sampling configuration is invalid, an error variant will be returned describing the
    /// issue.
    pub fn new<S: AsRef<str>>(adapter_codes: &[S], config: &MetricsConfig) -> Result<Self, Error> {
        let sink = Sink::resolve(config);
        let storage = AtomicStorage::new(config.sample.clone())?;
        let registry = Registry::new(storage, sink.registry_prefix(config));

        let mut codes = adapter_codes.iter().map(|c| c.as_ref().to_string()).collect::<Vec<_>>();
        codes.sort();
        codes.dedup();

        let counter =
            |name: &str| registry.get_or_create_counter(name, |c| Counter::from_arc(c.clone()));

        let metrics = BidderMetrics {
            requests: counter(names::REQUESTS),
            app_requests: counter(names::APP_REQUESTS),
            no_cookie_requests: counter(names::NO_COOKIE_REQUESTS),
            safari_requests: counter(names::SAFARI_REQUESTS),
            safari_no_cookie_requests: counter(names::SAFARI_NO_COOKIE_REQUESTS),
            error_requests: counter(names::ERROR_REQUESTS),
            invalid_requests: counter(names::INVALID_REQUESTS),
            cookie_sync_requests: counter(names::COOKIE_SYNC_REQUESTS),
            request_timer: registry
                .get_or_create_timer(names::REQUEST_TIME, |t| Timer::from_arc(t.clone())),
            adapters: AdapterMetrics::register_all(&registry, AdapterScope::Global, &codes),
            noop_adapter: Arc::new(AdapterMetrics::noop()),
            accounts: RwLock::new(HashMap::new()),
            transactions: config.transactions,
            adapter_codes: codes,
            sink,
            registry,
        };

        tracing::debug!(
            adapters = metrics.adapter_codes.len(),
            sink = %metrics.sink.kind(),
            "bidder metrics initialized"
        );

        Ok(metrics)
    }

    /// Gets the metrics for the given account, registering them on first use.
    ///
    /// Concurrent callers asking for the same, previously unseen account all observe a single
    /// instance, registered exactly once.
    ///
    /// Account identifiers are used verbatim as a segment of the metric names. Identifiers are not
    /// escaped, so one containing dots can map onto the names of another account: the requests
    /// counter of `a.adapter.b` is `account.a.adapter.b.requests`, which is also the requests
    /// counter of adapter `b` within account `a`. Both sets then share that counter.
    pub fn account_metrics(&self, id: &str) -> Arc<AccountMetrics> {
        if let Some(metrics) = self.accounts.read().get(id) {
            return Arc::clone(metrics);
        }

        let (metrics, created) = {
            let mut accounts = self.accounts.write();
            match accounts.get(id) {
                Some(metrics) => (Arc::clone(metrics), false),
                None => {
                    let metrics = Arc::new(AccountMetrics::register(
                        &self.registry,
                        id,
                        &self.adapter_codes,
                        Arc::clone(&self.noop_adapter),
                    ));
                    accounts.insert(id.to_string(), Arc::clone(&metrics));
                    (metrics, true)
                }
            }
        };

        if created {
            tracing::debug!(account = id, "registered account metrics");
        }

        metrics
    }

    /// Gets the server-wide metrics for the given adapter.
    ///
    /// If the adapter was not configured, a no-op set is returned.
    pub fn adapter_metrics(&self, code: &str) -> Arc<AdapterMetrics> {
        match self.adapters.get(code) {
            Some(metrics) => Arc::clone(metrics),
            None => {
                tracing::trace!(adapter = code, "unknown adapter code");
                Arc::clone(&self.noop_adapter)
            }
        }
    }

    /// Counts incoming requests.
    pub fn inc_request(&self, n: u64) {
        self.requests.increment(n);
    }

    /// Counts incoming requests made from an app.
    pub fn inc_app_request(&self, n: u64) {
        self.app_requests.increment(n);
    }

    /// Counts incoming requests without a user-sync cookie.
    pub fn inc_no_cookie(&self, n: u64) {
        self.no_cookie_requests.increment(n);
    }

    /// Counts incoming requests from Safari.
    pub fn inc_safari_request(&self, n: u64) {
        self.safari_requests.increment(n);
    }

    /// Counts incoming requests from Safari without a user-sync cookie.
    pub fn inc_safari_no_cookie(&self, n: u64) {
        self.safari_no_cookie_requests.increment(n);
    }

    /// Counts requests that failed.
    pub fn inc_error(&self, n: u64) {
        self.error_requests.increment(n);
    }

    /// Counts requests that could not be parsed or validated.
    pub fn inc_invalid(&self, n: u64) {
        self.invalid_requests.increment(n);
    }

    /// Counts cookie sync requests.
    pub fn inc_cookie_sync(&self, n: u64) {
        self.cookie_sync_requests.increment(n);
    }

    /// Records the time elapsed since `start` as one request latency sample.
    pub fn update_request_timer_since(&self, start: Instant) {
        self.request_timer.update_since(start);
    }

    /// Takes a point-in-time snapshot of every metric.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::collect(&self.registry)
    }

    /// Gets the number of accounts seen so far.
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Gets the configured adapter codes, sorted.
    pub fn adapter_codes(&self) -> &[String] {
        &self.adapter_codes
    }

    /// Gets the resolved metrics backend.
    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Gets the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl TransactionLogger for BidderMetrics {
    fn log_transaction(&self, kind: &str, request: &str, response: &str, status: u16) {
        self.transactions.log_transaction(kind, request, response, status);
    }
}

impl fmt::Debug for BidderMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidderMetrics")
            .field("registry", &self.registry)
            .field("sink", &self.sink)
            .field("transactions", &self.transactions)
            .field("adapter_codes", &self.adapter_codes)
            .field("accounts", &self.account_count())
            .finish_non_exhaustive()
    }
}

/// Builds the bidder metrics for the given adapters, ready to be shared across request handlers.
///
/// # Errors
///
/// If the sampling configuration is invalid, an error variant will be returned describing the
/// issue.
pub fn setup_metrics<S: AsRef<str>>(
    config: &MetricsConfig,
    adapter_codes: &[S],
) -> Result<Arc<BidderMetrics>, Error> {
    BidderMetrics::new(adapter_codes, config).map(Arc::new)
}

/// Builds the bidder metrics for the given adapters, returning them as a transaction logger.
///
/// # Errors
///
/// If the sampling configuration is invalid, an error variant will be returned describing the
/// issue.
pub fn setup_logging<S: AsRef<str>>(
    config: &MetricsConfig,
    adapter_codes: &[S],
) -> Result<Arc<dyn TransactionLogger>, Error> {
    let metrics: Arc<dyn TransactionLogger> = setup_metrics(config, adapter_codes)?;
    Ok(metrics)
}
