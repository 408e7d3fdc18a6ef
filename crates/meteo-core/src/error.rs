//! Error types for the relay
//!
//! This module defines all error types used throughout the workspace.
//!
//! The taxonomy follows the run-abort policy: every variant except the
//! network ones is fatal for the whole run. Resolution and connection
//! failures are retryable inside the delivery channel's bounded retry
//! loop and become [`Error::RetriesExhausted`] once the attempt budget
//! runs out. A send failure on an established connection is never
//! retried.

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the relay
#[derive(Error, Debug)]
pub enum Error {
    /// A source document does not have the expected shape
    /// (wrong node or row cardinality, missing attribute, unknown
    /// month/weekday text). Indicates an upstream format change.
    #[error("schema mismatch in {feed} feed: {detail}")]
    SchemaMismatch {
        /// Which feed produced the document
        feed: &'static str,
        /// What was expected and what was found
        detail: String,
    },

    /// A timestamp field failed to parse, after the single-digit-hour
    /// repair was attempted.
    #[error("unparseable timestamp in {feed} feed ({field}): {text:?}")]
    Timestamp {
        feed: &'static str,
        field: &'static str,
        text: String,
    },

    /// A temperature cell failed to parse, after the glyph-corruption
    /// fallback was attempted.
    #[error("unparseable temperature in {feed} feed: {text:?}")]
    Temperature { feed: &'static str, text: String },

    /// The two sources (or one source and the slot schedule) disagree in
    /// a way that must not be propagated as metrics.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Document retrieval failure (HTTP layer)
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Host name resolution failure (retryable)
    #[error("failed to resolve {host}: {detail}")]
    Resolve { host: String, detail: String },

    /// Socket-level network error (retryable while connecting)
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// The resolve+connect retry budget is spent
    #[error("giving up after {attempts} connection attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// Write failure on an established connection (never retried)
    #[error("send error: {0}")]
    Send(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a schema-mismatch error
    pub fn schema(feed: &'static str, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            feed,
            detail: detail.into(),
        }
    }

    /// Create a timestamp-parse error
    pub fn timestamp(feed: &'static str, field: &'static str, text: impl Into<String>) -> Self {
        Self::Timestamp {
            feed,
            field,
            text: text.into(),
        }
    }

    /// Create a temperature-parse error
    pub fn temperature(feed: &'static str, text: impl Into<String>) -> Self {
        Self::Temperature {
            feed,
            text: text.into(),
        }
    }

    /// Create a consistency-violation error
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a resolution error
    pub fn resolve(host: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Resolve {
            host: host.into(),
            detail: detail.into(),
        }
    }

    /// Create a send error
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures the delivery channel may retry (resolution and
    /// connection errors before any data was written).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolve { .. } | Self::Network(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
