// =============================================================================
// Error taxonomy for the candle feed engine
// =============================================================================
//
// Kinds mirror the user-error / transient-transport / parse / configuration
// split described for the engine: user errors are raised synchronously and
// never retried, transport errors carry a retryable flag strategies consult
// before backing off, parse errors are logged and dropped, `NotSupported`
// is fatal to whatever `start()` call triggered it.
// =============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("unsupported interval: {0}")]
    UnsupportedInterval(String),

    #[error("invalid trading pair: {0}")]
    InvalidPair(String),

    #[error("transport error (status={status:?}, retryable={retryable}): {message}")]
    TransportError {
        status: Option<u16>,
        message: String,
        body: Option<String>,
        retryable: bool,
    },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

impl FeedError {
    /// True for transport errors the caller may retry (5xx, connection reset,
    /// timeout). User, parse and configuration errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::TransportError { retryable, .. } if *retryable)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        FeedError::TransportError {
            status: None,
            message: message.into(),
            body: None,
            retryable: true,
        }
    }

    pub fn transport_status(status: u16, body: impl Into<String>) -> Self {
        let retryable = status >= 500 || status == 429;
        FeedError::TransportError {
            status: Some(status),
            message: format!("HTTP {status}"),
            body: Some(body.into()),
            retryable,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        let retryable = e.is_timeout() || e.is_connect() || e.is_request();
        FeedError::TransportError {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            body: None,
            retryable,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::TransportError {
            status: None,
            message: e.to_string(),
            body: None,
            retryable: true,
        }
    }
}
