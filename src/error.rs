use crate::error_code::ErrorClass;
use crate::transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or parameter name that caused the error (e.g., "connection.api_key", "request.attachments[1]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "connection_builder", "rest_driver")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse error taxonomy surfaced to the host together with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing connection parameters. Never reaches the network.
    Config,
    /// Malformed prompt or attachment payload, or a request the service rejected as invalid.
    Validation,
    /// Rejected credential (401/403).
    Auth,
    /// Network-level failure: timeout, DNS, refused or reset connection, cancellation, 5xx.
    Transport,
    /// 2xx response whose body does not match the expected shape.
    ResponseFormat,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "ConfigError",
            Self::Validation => "ValidationError",
            Self::Auth => "AuthError",
            Self::Transport => "TransportError",
            Self::ResponseFormat => "ResponseFormatError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the connector.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Authentication failed: HTTP {status}: {message}")]
    Authentication { status: u16, message: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Remote error: HTTP {status} ({class}): {message}")]
    Remote {
        status: u16,
        class: ErrorClass,
        message: String,
    },

    #[error("Response format error: {message}{}", format_context(.context))]
    ResponseFormat {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn response_format(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::ResponseFormat {
            message: msg.into(),
            context,
        }
    }

    /// Classified kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Config,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Authentication { .. } => ErrorKind::Auth,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Remote { class, .. } => class.kind(),
            Error::ResponseFormat { .. } => ErrorKind::ResponseFormat,
        }
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    ///
    /// The connector itself never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_transient(),
            Error::Remote { class, .. } => class.retryable(),
            _ => false,
        }
    }

    /// HTTP status for errors that came back from the service.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } | Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::ResponseFormat { context, .. } => Some(context),
            _ => None,
        }
    }
}
