//! Transaction logging.
use std::{
    io::{self, Write},
    sync::Arc,
};

use serde::Deserialize;

/// Target used for transactions emitted through [`TransactionLog::Tracing`].
pub const TRANSACTION_TARGET: &str = "bidder_metrics::transaction";

/// Records the outcome of a single request.
///
/// Implementations are called on the request path and must not block the caller for long.
pub trait TransactionLogger: Send + Sync {
    /// Logs a request of the given kind, along with its response and status code.
    fn log_transaction(&self, kind: &str, request: &str, response: &str, status: u16);
}

impl<T> TransactionLogger for Arc<T>
where
    T: TransactionLogger + ?Sized,
{
    fn log_transaction(&self, kind: &str, request: &str, response: &str, status: u16) {
        (**self).log_transaction(kind, request, response, status)
    }
}

/// Where transactions are written.
///
/// The sink is chosen once, from configuration, and never changes afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionLog {
    /// Transactions are dropped.
    #[serde(rename = "none")]
    Discard,

    /// Transactions are written to standard output as plain text.
    Console,

    /// Transactions are emitted as `tracing` events at the `INFO` level, under
    /// [`TRANSACTION_TARGET`].
    #[default]
    Tracing,
}

impl TransactionLogger for TransactionLog {
    fn log_transaction(&self, kind: &str, request: &str, response: &str, status: u16) {
        match self {
            TransactionLog::Discard => {}
            TransactionLog::Console => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                if let Err(e) = write_transaction(&mut out, kind, request, response, status) {
                    tracing::warn!(error = %e, "failed to write transaction to stdout");
                }
            }
            TransactionLog::Tracing => {
                tracing::info!(
                    target: TRANSACTION_TARGET,
                    kind,
                    request,
                    response,
                    status,
                    "transaction"
                );
            }
        }
    }
}

/// Writes a transaction as plain text.
///
/// # Errors
///
/// If the writer fails, the underlying I/O error is returned.
pub fn write_transaction<W: Write + ?Sized>(
    writer: &mut W,
    kind: &str,
    request: &str,
    response: &str,
    status: u16,
) -> io::Result<()> {
    writeln!(writer, "Request type: {kind}")?;
    writeln!(writer, "Request body: {request}")?;
    writeln!(writer, "Response: {response}")?;
    writeln!(writer, "Response code: {status}")?;
    writeln!(writer)
}
