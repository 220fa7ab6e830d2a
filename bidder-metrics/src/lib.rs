//! Request metrics for a bidding server.
//!
//! `bidder-metrics` records counts, timings, and price distributions for the requests a bidding
//! server handles, broken down per adapter (the advertising exchanges bids are requested from) and
//! per publisher account. It also provides the transaction logger used to record the outcome of
//! each request.
//!
//! # Usage
//!
//! ```
//! # use bidder_metrics::{BidderMetrics, MetricsConfig};
//! # use std::time::Instant;
//! let config = MetricsConfig::default();
//! let metrics = BidderMetrics::new(&["appnexus", "rubicon"], &config)
//!     .expect("failed to build metrics");
//!
//! let start = Instant::now();
//! metrics.inc_request(1);
//!
//! // Account metrics are registered the first time an account is seen.
//! let account = metrics.account_metrics("pub1");
//! account.inc_request(1);
//! account.adapter_metrics("appnexus").inc_bids_received(2);
//!
//! // Adapters that were never configured get a set that does nothing.
//! metrics.adapter_metrics("unknown").inc_request(1);
//!
//! metrics.update_request_timer_since(start);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.counter("account.pub1.adapter.appnexus.bids_received"), Some(2));
//! ```
//!
//! # Hierarchy
//!
//! Metrics are organized in three levels, each with stable, dotted names:
//!
//! - server-wide metrics, such as `requests` or `request_time`
//! - per-adapter metrics, under `adapter.<code>.<metric>`
//! - per-account metrics, under `account.<id>.<metric>`, each account holding its own set of
//!   per-adapter metrics under `account.<id>.adapter.<code>.<metric>`
//!
//! Adapter sets are registered up front. Account sets are registered on first use, exactly once
//! even under concurrent access, and are never evicted.
//!
//! # Backends
//!
//! Metrics are not transmitted by this crate. The configured backend is resolved into a [`Sink`],
//! and exporters read [`BidderMetrics::snapshot`] on their own schedule. Timers and histograms are
//! backed by exponentially-decaying reservoirs, so snapshots describe recent behavior. Timers also
//! carry their recording [`Rates`]: a lifetime mean plus one, five and fifteen minute averages.
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod account;
pub use self::account::AccountMetrics;

mod adapter;
pub use self::adapter::AdapterMetrics;

mod bidder;
pub use self::bidder::{setup_logging, setup_metrics, BidderMetrics};

mod config;
pub use self::config::{MetricsConfig, SinkKind};

mod distribution;
pub use self::distribution::Distribution;

mod error;
pub use self::error::Error;

mod handles;
pub use self::handles::{Counter, Histogram, Timer};

mod kind;
pub use self::kind::MetricKind;

pub mod names;

mod quantile;
pub use self::quantile::{default_quantiles, parse_quantiles, Quantile};

pub mod registry;

mod response;
pub use self::response::{to_log_string, BufferedResponse, ResponseLog, ResponseWriter, STATUS_OK};

mod sink;
pub use self::sink::{GraphiteSink, InfluxDbSink, Sink};

mod snapshot;
pub use self::snapshot::{Snapshot, SnapshotValue};

pub mod storage;
pub use self::storage::Rates;

mod transaction;
pub use self::transaction::{
    write_transaction, TransactionLog, TransactionLogger, TRANSACTION_TARGET,
};
