//! Metrics configuration.
use std::{fmt, fs, path::Path};

use serde::{Deserialize, Deserializer};

use crate::{error::Error, storage::SampleConfig, transaction::TransactionLog};

/// The kind of backend metrics are pushed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// No backend.
    #[default]
    None,

    /// A local file.
    File,

    /// An InfluxDB server.
    InfluxDb,

    /// A Graphite server.
    Graphite,
}

impl SinkKind {
    /// Parses a sink kind from its configured name.
    ///
    /// Names are matched exactly. Anything unrecognized, including an empty name, maps to
    /// [`SinkKind::None`].
    pub fn from_name(name: &str) -> SinkKind {
        match name {
            "file" => SinkKind::File,
            "influxdb" => SinkKind::InfluxDb,
            "graphite" => SinkKind::Graphite,
            _ => SinkKind::None,
        }
    }

    /// Gets the configured name of this sink kind.
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::None => "none",
            SinkKind::File => "file",
            SinkKind::InfluxDb => "influxdb",
            SinkKind::Graphite => "graphite",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SinkKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(SinkKind::from_name(&name))
    }
}

/// Configuration for the bidder metrics.
///
/// Every field has a default, so an empty document yields a configuration with no active backend.
///
/// ```yaml
/// type: influxdb
/// host: http://localhost:8086
/// database: bidder
/// username: admin
/// password: secret
/// interval: 10
/// prefix: bidder
/// ```
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Backend metrics are pushed to.
    #[serde(rename = "type")]
    pub kind: SinkKind,

    /// Backend address: a URL for InfluxDB, or `host:port` for Graphite.
    pub host: String,

    /// InfluxDB database.
    pub database: String,

    /// InfluxDB username.
    pub username: String,

    /// InfluxDB password.
    pub password: String,

    /// Push interval, in seconds.
    pub interval: u64,

    /// Prefix applied to metric names.
    pub prefix: String,

    /// Sampling configuration for timers and histograms.
    pub sample: SampleConfig,

    /// Where transactions are logged.
    pub transactions: TransactionLog,
}

impl MetricsConfig {
    /// Parses a configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// If the document is not valid YAML, or does not describe a valid configuration, an error
    /// variant will be returned describing the issue.
    pub fn from_yaml_str(s: &str) -> Result<Self, Error> {
        serde_yaml::from_str(s).map_err(Into::into)
    }

    /// Reads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed, an error variant will be returned describing the
    /// issue.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Sets the backend metrics are pushed to.
    #[must_use]
    pub fn with_kind(mut self, kind: SinkKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the backend address.
    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the InfluxDB database and credentials.
    #[must_use]
    pub fn with_database<D, U, P>(mut self, database: D, username: U, password: P) -> Self
    where
        D: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        self.database = database.into();
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the push interval, in seconds.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the prefix applied to metric names.
    #[must_use]
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the sampling configuration for timers and histograms.
    #[must_use]
    pub fn with_sample(mut self, sample: SampleConfig) -> Self {
        self.sample = sample;
        self
    }

    /// Sets where transactions are logged.
    #[must_use]
    pub fn with_transactions(mut self, transactions: TransactionLog) -> Self {
        self.transactions = transactions;
        self
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            kind: SinkKind::None,
            host: String::new(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            interval: 10,
            prefix: String::new(),
            sample: SampleConfig::default(),
            transactions: TransactionLog::default(),
        }
    }
}

impl fmt::Debug for MetricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("interval", &self.interval)
            .field("prefix", &self.prefix)
            .field("sample", &self.sample)
            .field("transactions", &self.transactions)
            .finish()
    }
}
