//! Remote error classes.
//!
//! Every non-2xx response and every error payload returned by the service is
//! reduced to one [`ErrorClass`]. The class decides the [`ErrorKind`] the host
//! sees and carries a retry hint for callers that run their own retry policy.
//!
//! ## Example
//!
//! ```rust
//! use volcano_llm::error_code::ErrorClass;
//! use volcano_llm::ErrorKind;
//!
//! let class = ErrorClass::from_http_status(429);
//! assert_eq!(class.name(), "rate_limited");
//! assert!(class.retryable());
//! assert_eq!(class.kind(), ErrorKind::Transport);
//! ```

use crate::error::ErrorKind;
use std::fmt;

/// Standard class of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed request, invalid parameters, or missing required fields
    InvalidRequest,
    /// Invalid, expired, or missing API key
    Authentication,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Endpoint or model deployment does not exist (often a wrong region or endpoint id)
    NotFound,
    /// Input exceeds context window or payload size limit
    RequestTooLarge,
    /// Request rate or quota limit exceeded
    RateLimited,
    /// Internal server error on the service side
    ServerError,
    /// Service temporarily overloaded
    Overloaded,
    /// Request timed out on the service side
    Timeout,
    /// Error could not be classified
    Unknown,
}

impl ErrorClass {
    /// Returns the standard name (e.g., `"invalid_request"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Returns whether a caller-side retry is reasonable for this class.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::Overloaded | Self::Timeout
        )
    }

    /// Error kind surfaced to the host for this class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication | Self::PermissionDenied => ErrorKind::Auth,
            Self::InvalidRequest | Self::NotFound | Self::RequestTooLarge => ErrorKind::Validation,
            Self::RateLimited
            | Self::ServerError
            | Self::Overloaded
            | Self::Timeout
            | Self::Unknown => ErrorKind::Transport,
        }
    }

    /// Maps a provider error code/type string to an `ErrorClass`.
    ///
    /// Matching ignores case, `_` and `.` so that both OpenAI-style snake case
    /// (`"invalid_api_key"`) and Ark-style Pascal case (`"AuthenticationError"`)
    /// resolve.
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let normalized: String = provider_code
            .chars()
            .filter(|c| *c != '_' && *c != '.')
            .flat_map(char::to_lowercase)
            .collect();
        let class = match normalized.as_str() {
            "invalidrequest" | "invalidrequesterror" | "invalidparameter" | "missingparameter"
            | "badrequest" => Self::InvalidRequest,
            "authentication" | "authenticationerror" | "invalidapikey" | "unauthorized"
            | "authorizederror" => Self::Authentication,
            "permissiondenied" | "permissionerror" | "accessdenied" | "forbidden" => {
                Self::PermissionDenied
            }
            "notfound" | "modelnotfound" | "invalidendpointnotfound" | "endpointnotfound" => {
                Self::NotFound
            }
            "requesttoolarge" | "contextlengthexceeded" => Self::RequestTooLarge,
            "ratelimited" | "ratelimitexceeded" | "quotaexceeded" | "insufficientquota" => {
                Self::RateLimited
            }
            "servererror" | "internalserviceerror" | "internalerror" => Self::ServerError,
            "overloaded" | "overloadederror" | "serveroverloaded" => Self::Overloaded,
            "timeout" => Self::Timeout,
            _ => return None,
        };
        Some(class)
    }

    /// Maps an HTTP status code to the most likely `ErrorClass`.
    ///
    /// Unmapped 4xx statuses are treated as invalid requests, unmapped 5xx
    /// statuses as server errors.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited,
            500 | 502 => Self::ServerError,
            503 | 529 => Self::Overloaded,
            s if (400..500).contains(&s) => Self::InvalidRequest,
            s if (500..600).contains(&s) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
