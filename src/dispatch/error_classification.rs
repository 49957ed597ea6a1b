//! Error classification for service responses.
//!
//! - 401/403 and credential error codes → [`Error::Authentication`]
//! - other non-2xx statuses → [`Error::Remote`] with an [`ErrorClass`] from the status
//! - error payloads inside a 2xx body → classified by provider code, or a
//!   response-format error when the code is unknown

use crate::error_code::ErrorClass;
use crate::{Error, ErrorContext};
use serde_json::Value;

/// Upper bound for raw bodies echoed into error messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Provider error object as found under the `error` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorPayload {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorPayload {
    /// Extract `error.{code,type,message}` (or a bare `error` string) from a body.
    pub(crate) fn from_value(body: &Value) -> Option<Self> {
        let err = body.get("error")?;
        match err {
            Value::String(s) => Some(Self {
                code: None,
                message: Some(s.clone()),
            }),
            Value::Object(map) => {
                let text = |key: &str| map.get(key).and_then(|v| v.as_str()).map(String::from);
                Some(Self {
                    code: text("code").or_else(|| text("type")),
                    message: text("message"),
                })
            }
            _ => None,
        }
    }

    fn class(&self) -> Option<ErrorClass> {
        self.code.as_deref().and_then(ErrorClass::from_provider_code)
    }
}

/// Classify a non-2xx response.
pub(crate) fn classify_status(status: u16, body: &str) -> Error {
    let payload = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| ErrorPayload::from_value(&v));
    let message = payload
        .as_ref()
        .and_then(|p| p.message.clone())
        .unwrap_or_else(|| truncate(body.trim()));

    let class = ErrorClass::from_http_status(status);
    match class {
        ErrorClass::Authentication | ErrorClass::PermissionDenied => {
            Error::Authentication { status, message }
        }
        _ => Error::Remote {
            status,
            class,
            message,
        },
    }
}

/// Classify an error object found in a 2xx body.
pub(crate) fn classify_payload(status: u16, payload: &ErrorPayload, source: &str) -> Error {
    let message = payload
        .message
        .clone()
        .unwrap_or_else(|| "service returned an error payload".to_string());
    match payload.class() {
        Some(ErrorClass::Authentication | ErrorClass::PermissionDenied) => {
            Error::Authentication { status, message }
        }
        Some(class) => Error::Remote {
            status,
            class,
            message,
        },
        None => {
            let mut ctx = ErrorContext::new()
                .with_field_path("response.error")
                .with_source(source);
            if let Some(code) = &payload.code {
                ctx = ctx.with_details(format!("code: {}", code));
            }
            Error::response_format(message, ctx)
        }
    }
}

fn truncate(body: &str) -> String {
    if body.is_empty() {
        return "empty response body".to_string();
    }
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut s: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    s.push_str("...");
    s
}
