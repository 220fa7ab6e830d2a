use std::io;

use thiserror::Error;

/// Errors that could occur while configuring or building the bidder metrics.
///
/// Only startup paths can fail. Once built, every recording operation is infallible.
#[derive(Debug, Error)]
pub enum Error {
    /// The sampling configuration for timers and histograms was invalid.
    #[error("invalid sample configuration: {reason}")]
    InvalidSample {
        /// Details about the invalid setting.
        reason: String,
    },

    /// The metrics configuration could not be parsed.
    #[error("failed to parse metrics configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The metrics configuration could not be read.
    #[error("failed to read metrics configuration: {0}")]
    Io(#[from] io::Error),
}
