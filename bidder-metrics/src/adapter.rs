use std::{collections::HashMap, sync::Arc, time::Instant};

use crate::{
    handles::{Counter, Histogram, Timer},
    names::{self, AdapterScope},
    registry::Registry,
};

/// Metrics for a single adapter, either server-wide or within one account.
///
/// Every operation applies directly to the underlying primitive: none of them block, allocate, or
/// fail. Sets obtained for an adapter that was never configured are no-ops.
#[derive(Clone, Debug)]
pub struct AdapterMetrics {
    requests: Counter,
    errors: Counter,
    no_bids: Counter,
    timeouts: Counter,
    no_cookies: Counter,
    request_timer: Timer,
    prices: Histogram,
    bids_received: Counter,
}

impl AdapterMetrics {
    /// Registers the metrics for `code` within `scope`.
    ///
    /// Received bids are only counted in the account scope; the server-wide set gets a no-op.
    pub(crate) fn register(registry: &Registry, scope: AdapterScope<'_>, code: &str) -> Self {
        let counter = |metric: &str| {
            registry.get_or_create_counter(&scope.metric_name(code, metric), |c| {
                Counter::from_arc(c.clone())
            })
        };

        let bids_received = if scope.tracks_bids_received() {
            counter(names::BIDS_RECEIVED)
        } else {
            Counter::noop()
        };

        AdapterMetrics {
            requests: counter(names::REQUESTS),
            errors: counter(names::ERROR_REQUESTS),
            no_bids: counter(names::NO_BID_REQUESTS),
            timeouts: counter(names::TIMEOUT_REQUESTS),
            no_cookies: counter(names::NO_COOKIE_REQUESTS),
            request_timer: registry
                .get_or_create_timer(&scope.metric_name(code, names::REQUEST_TIME), |t| {
                    Timer::from_arc(t.clone())
                }),
            prices: registry
                .get_or_create_histogram(&scope.metric_name(code, names::PRICES), |h| {
                    Histogram::from_arc(h.clone())
                }),
            bids_received,
        }
    }

    /// Registers one set per adapter code within `scope`.
    pub(crate) fn register_all<S: AsRef<str>>(
        registry: &Registry,
        scope: AdapterScope<'_>,
        codes: &[S],
    ) -> HashMap<String, Arc<AdapterMetrics>> {
        codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                (code.to_string(), Arc::new(AdapterMetrics::register(registry, scope, code)))
            })
            .collect()
    }

    /// Creates a set whose operations do nothing.
    pub(crate) fn noop() -> Self {
        AdapterMetrics {
            requests: Counter::noop(),
            errors: Counter::noop(),
            no_bids: Counter::noop(),
            timeouts: Counter::noop(),
            no_cookies: Counter::noop(),
            request_timer: Timer::noop(),
            prices: Histogram::noop(),
            bids_received: Counter::noop(),
        }
    }

    /// Returns `true` if this set does nothing.
    pub fn is_noop(&self) -> bool {
        self.requests.is_noop()
    }

    /// Counts requests sent to the adapter.
    pub fn inc_request(&self, n: u64) {
        self.requests.increment(n);
    }

    /// Counts adapter requests that failed.
    pub fn inc_error(&self, n: u64) {
        self.errors.increment(n);
    }

    /// Counts adapter requests that returned no bids.
    pub fn inc_no_bid(&self, n: u64) {
        self.no_bids.increment(n);
    }

    /// Counts adapter requests that timed out.
    pub fn inc_timeout(&self, n: u64) {
        self.timeouts.increment(n);
    }

    /// Counts adapter requests made without a user-sync cookie.
    pub fn inc_no_cookie(&self, n: u64) {
        self.no_cookies.increment(n);
    }

    /// Counts bids received from the adapter.
    ///
    /// Only recorded for sets scoped to an account.
    pub fn inc_bids_received(&self, n: u64) {
        self.bids_received.increment(n);
    }

    /// Records a bid price, in CPM.
    pub fn update_price_histogram(&self, cpm: i64) {
        self.prices.update(cpm);
    }

    /// Records the time elapsed since `start` as one adapter request latency sample.
    pub fn update_request_timer_since(&self, start: Instant) {
        self.request_timer.update_since(start);
    }

    /// Gets the request counter.
    pub fn requests(&self) -> &Counter {
        &self.requests
    }

    /// Gets the error counter.
    pub fn errors(&self) -> &Counter {
        &self.errors
    }

    /// Gets the no-bid counter.
    pub fn no_bids(&self) -> &Counter {
        &self.no_bids
    }

    /// Gets the timeout counter.
    pub fn timeouts(&self) -> &Counter {
        &self.timeouts
    }

    /// Gets the no-cookie counter.
    pub fn no_cookies(&self) -> &Counter {
        &self.no_cookies
    }

    /// Gets the request latency timer.
    pub fn request_timer(&self) -> &Timer {
        &self.request_timer
    }

    /// Gets the bid price histogram.
    pub fn prices(&self) -> &Histogram {
        &self.prices
    }

    /// Gets the received bids counter.
    pub fn bids_received(&self) -> &Counter {
        &self.bids_received
    }
}
