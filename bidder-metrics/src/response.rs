//! Writing error responses and logging their transactions.
use std::io;

use serde::Serialize;

use crate::transaction::TransactionLogger;

/// HTTP status code for a successful response.
pub const STATUS_OK: u16 = 200;

/// The parts of an HTTP response written when a request fails.
pub trait ResponseWriter {
    /// Writes the status line.
    fn write_status(&mut self, status: u16) -> io::Result<()>;

    /// Writes the response body.
    fn write_body(&mut self, body: &[u8]) -> io::Result<()>;
}

/// A [`ResponseWriter`] which buffers everything in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    status: Option<u16>,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Creates an empty `BufferedResponse`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the written status, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Gets the written body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_status(&mut self, status: u16) -> io::Result<()> {
        self.status = Some(status);
        Ok(())
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }
}

/// A finished request, ready to be written out and logged.
#[derive(Clone, Copy, Debug)]
pub struct ResponseLog<'a> {
    /// Kind of request, usually the endpoint.
    pub kind: &'a str,
    /// Request payload.
    pub request: &'a str,
    /// Status code.
    pub status: u16,
    /// Response message.
    pub response: &'a str,
}

impl ResponseLog<'_> {
    /// Writes the response and logs the transaction.
    ///
    /// If the status is anything other than [`STATUS_OK`], the status and the response message are
    /// written first. The transaction is always logged afterwards, even if writing fails.
    pub fn write<W, L>(&self, writer: &mut W, logger: &L)
    where
        W: ResponseWriter + ?Sized,
        L: TransactionLogger + ?Sized,
    {
        if self.status != STATUS_OK {
            let result = writer
                .write_status(self.status)
                .and_then(|()| writer.write_body(self.response.as_bytes()));
            if let Err(e) = result {
                tracing::warn!(
                    kind = self.kind,
                    status = self.status,
                    error = %e,
                    "failed to write response"
                );
            }
        }

        logger.log_transaction(self.kind, self.request, self.response, self.status);
    }
}

/// Serializes a payload as JSON for the transaction log.
///
/// If serialization fails, a fixed marker naming `what` is returned instead.
pub fn to_log_string<T: Serialize + ?Sized>(value: &T, what: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("Json parse error for {what} "))
}
