//! HTTP transport shared by both dispatch modes.
//!
//! One pooled `reqwest::Client` serves every call; the pool is the only shared
//! resource in the connector and is safe to use from concurrent workflow runs.

pub mod http;

pub use http::{HttpTransport, TransportConfig};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Map a reqwest failure, separating timeouts and connect failures from the rest.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connect(_) => true,
            TransportError::Http(e) => e.is_request() || e.is_body(),
            TransportError::Cancelled | TransportError::Other(_) => false,
        }
    }
}
