//! Metric names.
//!
//! Names are part of the contract with the time-series backend and must remain stable.
use std::borrow::Cow;

/// Total requests, globally or for an adapter or account.
pub const REQUESTS: &str = "requests";
/// Requests originating from an app rather than a browser.
pub const APP_REQUESTS: &str = "app_requests";
/// Requests without a user-sync cookie.
pub const NO_COOKIE_REQUESTS: &str = "no_cookie_requests";
/// Requests from Safari.
pub const SAFARI_REQUESTS: &str = "safari_requests";
/// Requests from Safari without a user-sync cookie.
pub const SAFARI_NO_COOKIE_REQUESTS: &str = "safari_no_cookie_requests";
/// Requests that failed.
pub const ERROR_REQUESTS: &str = "error_requests";
/// Requests that could not be parsed or validated.
pub const INVALID_REQUESTS: &str = "invalid_requests";
/// Request latency.
pub const REQUEST_TIME: &str = "request_time";
/// Cookie sync requests.
pub const COOKIE_SYNC_REQUESTS: &str = "cookie_sync_requests";
/// Adapter requests that returned no bids.
pub const NO_BID_REQUESTS: &str = "no_bid_requests";
/// Adapter requests that timed out.
pub const TIMEOUT_REQUESTS: &str = "timeout_requests";
/// Bid price distribution.
pub const PRICES: &str = "prices";
/// Bids received.
pub const BIDS_RECEIVED: &str = "bids_received";

/// The scope an adapter metric set is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterScope<'a> {
    /// Server-wide metrics for an adapter: `adapter.<code>.<metric>`.
    Global,

    /// Metrics for an adapter within a single account: `account.<id>.adapter.<code>.<metric>`.
    Account(&'a str),
}

impl AdapterScope<'_> {
    /// Builds the full name of an adapter metric within this scope.
    pub fn metric_name(&self, code: &str, metric: &str) -> String {
        match *self {
            AdapterScope::Global => join(&["adapter", code, metric]),
            AdapterScope::Account(id) => join(&["account", id, "adapter", code, metric]),
        }
    }

    /// Returns `true` if adapter sets in this scope count received bids.
    pub fn tracks_bids_received(&self) -> bool {
        matches!(self, AdapterScope::Account(_))
    }
}

/// Builds the full name of an account metric: `account.<id>.<metric>`.
pub fn account_metric_name(id: &str, metric: &str) -> String {
    join(&["account", id, metric])
}

fn join(parts: &[&str]) -> String {
    let len = parts.iter().map(|p| p.len()).sum::<usize>() + parts.len().saturating_sub(1);
    let mut name = String::with_capacity(len);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            name.push('.');
        }
        name.push_str(part);
    }
    name
}

/// Applies a prefix to metric names.
///
/// Names will be prefixed in the format of `<prefix>.<remaining>`. An empty prefix leaves names
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prefix(Option<String>);

impl Prefix {
    /// Creates a new `Prefix`.
    pub fn new<S: Into<String>>(prefix: S) -> Prefix {
        let prefix = prefix.into();
        if prefix.is_empty() {
            Prefix(None)
        } else {
            Prefix(Some(prefix))
        }
    }

    /// Creates a `Prefix` which leaves names untouched.
    pub fn none() -> Prefix {
        Prefix(None)
    }

    /// Gets the prefix, if any.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Applies the prefix to the given name.
    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match &self.0 {
            None => Cow::Borrowed(name),
            Some(prefix) => {
                let mut new_name = String::with_capacity(prefix.len() + 1 + name.len());
                new_name.push_str(prefix);
                new_name.push('.');
                new_name.push_str(name);
                Cow::Owned(new_name)
            }
        }
    }
}
