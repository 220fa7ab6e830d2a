//! Resolution of the configured metrics backend.
use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use crate::{
    config::{MetricsConfig, SinkKind},
    names::Prefix,
};

/// Settings for pushing to an InfluxDB server.
#[derive(Clone, PartialEq, Eq)]
pub struct InfluxDbSink {
    /// Server URL.
    pub url: String,
    /// Database.
    pub database: String,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Push interval.
    pub interval: Duration,
}

impl fmt::Debug for InfluxDbSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxDbSink")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("interval", &self.interval)
            .finish()
    }
}

/// Settings for pushing to a Graphite server.
///
/// Unlike InfluxDB, names are registered unprefixed and the exporter applies the prefix when
/// writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphiteSink {
    /// Resolved server address.
    pub addr: SocketAddr,
    /// Push interval.
    pub interval: Duration,
    /// Prefix the exporter applies to every name.
    pub prefix: String,
}

/// The resolved metrics backend.
///
/// This only describes where metrics should go; transmitting them is left to an exporter reading
/// [`BidderMetrics::snapshot`][crate::BidderMetrics::snapshot].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Sink {
    /// No backend.
    #[default]
    None,

    /// A local file. Recognized, but there is no built-in transmitter for it.
    File,

    /// An InfluxDB server.
    InfluxDb(InfluxDbSink),

    /// A Graphite server.
    Graphite(GraphiteSink),
}

impl Sink {
    /// Resolves the backend described by the given configuration.
    ///
    /// This never fails: if the Graphite host cannot be resolved, a warning is logged and no
    /// backend is used.
    pub fn resolve(config: &MetricsConfig) -> Sink {
        let interval = Duration::from_secs(config.interval);

        match config.kind {
            SinkKind::None => Sink::None,
            SinkKind::File => Sink::File,
            SinkKind::InfluxDb => Sink::InfluxDb(InfluxDbSink {
                url: config.host.clone(),
                database: config.database.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
                interval,
            }),
            SinkKind::Graphite => match resolve_addr(&config.host) {
                Ok(addr) => {
                    Sink::Graphite(GraphiteSink { addr, interval, prefix: config.prefix.clone() })
                }
                Err(e) => {
                    tracing::warn!(
                        host = %config.host,
                        error = %e,
                        "failed to resolve graphite address; metrics will not be pushed"
                    );
                    Sink::None
                }
            },
        }
    }

    /// Gets the kind of this backend.
    pub fn kind(&self) -> SinkKind {
        match self {
            Sink::None => SinkKind::None,
            Sink::File => SinkKind::File,
            Sink::InfluxDb(_) => SinkKind::InfluxDb,
            Sink::Graphite(_) => SinkKind::Graphite,
        }
    }

    /// Returns `true` if metrics should be pushed somewhere.
    pub fn is_active(&self) -> bool {
        !matches!(self, Sink::None)
    }

    /// Gets the push interval, if there is a remote backend.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Sink::InfluxDb(sink) => Some(sink.interval),
            Sink::Graphite(sink) => Some(sink.interval),
            Sink::None | Sink::File => None,
        }
    }

    /// Gets the prefix the registry should apply to every name.
    ///
    /// Only InfluxDB expects the registry to prefix names.
    pub fn registry_prefix(&self, config: &MetricsConfig) -> Prefix {
        match self {
            Sink::InfluxDb(_) => Prefix::new(config.prefix.as_str()),
            _ => Prefix::none(),
        }
    }
}

fn resolve_addr(host: &str) -> std::io::Result<SocketAddr> {
    host.to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
    })
}
