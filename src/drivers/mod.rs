//! Protocol drivers: one implementation per [`ApiMode`].
//!
//! A driver turns a [`PromptRequest`] into a mode-specific HTTP request and
//! turns the mode-specific response body back into a [`NormalizedResult`].
//! The dispatcher picks the driver once per call via [`driver_for`] and never
//! branches on the mode again.

pub mod openapi;
pub mod rest;

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::connection::{ApiMode, ConnectionDescriptor};
use crate::dispatch::error_classification::{classify_payload, ErrorPayload};
use crate::types::{NormalizedResult, PromptRequest, StreamEvent};
use crate::{Error, ErrorContext, Result};

pub use openapi::OpenApiDriver;
pub use rest::RestDriver;

/// Mode-specific HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    /// Target URL (base_url + chat path).
    pub url: String,
    /// Headers beyond bearer auth and content type.
    pub headers: Vec<(&'static str, &'static str)>,
    /// Serialized JSON request body.
    pub body: Value,
    /// Whether streaming is requested.
    pub stream: bool,
}

/// Core trait for mode-specific request/response handling.
pub trait ProtocolDriver: Send + Sync + fmt::Debug {
    /// Mode this driver implements.
    fn mode(&self) -> ApiMode;

    /// Build the HTTP request. Validates the prompt first; fails before any I/O.
    fn build_request(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
        stream: bool,
    ) -> Result<DriverRequest>;

    /// Parse a complete 2xx response body.
    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResult>;

    /// Parse the payload of a single SSE `data:` frame.
    fn parse_stream_chunk(&self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Check if the done signal has been received in streaming.
    fn is_stream_done(&self, data: &str) -> bool {
        data.trim() == "[DONE]"
    }
}

static OPENAPI_DRIVER: OpenApiDriver = OpenApiDriver;
static REST_DRIVER: RestDriver = RestDriver;

/// Driver for `mode`.
pub fn driver_for(mode: ApiMode) -> &'static dyn ProtocolDriver {
    match mode {
        ApiMode::OpenApiCompatible => &OPENAPI_DRIVER,
        ApiMode::Rest => &REST_DRIVER,
    }
}

/// Parse a raw 2xx body with the driver for `mode`.
pub fn parse(mode: ApiMode, body: &[u8]) -> Result<NormalizedResult> {
    driver_for(mode).parse_response(body)
}

/// Join a base URL and a relative path, checking the result is an absolute http(s) URL.
pub(crate) fn join_url(base: &str, path: &str) -> Result<String> {
    let joined = format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let invalid = |details: String| {
        Error::configuration(
            format!("invalid base url '{}'", base),
            ErrorContext::new()
                .with_field_path("connection.base_url")
                .with_details(details)
                .with_source("url_resolver"),
        )
    };
    let parsed = url::Url::parse(&joined).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(joined)
}

/// Parse a body as JSON and surface any embedded error object.
pub(crate) fn parse_json_body(body: &[u8], source: &str) -> Result<Value> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::response_format(
            "response body is not valid JSON",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source(source),
        )
    })?;
    if !value.is_object() {
        return Err(Error::response_format(
            "response body is not a JSON object",
            ErrorContext::new().with_source(source),
        ));
    }
    if value.get("choices").is_none() {
        if let Some(payload) = ErrorPayload::from_value(&value) {
            return Err(classify_payload(200, &payload, source));
        }
    }
    Ok(value)
}

/// Deserialize an optional field, treating null or a value of the wrong type
/// as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn mode_mismatch(descriptor: &ConnectionDescriptor, expected: ApiMode) -> Error {
    Error::configuration(
        format!(
            "connection uses {} mode but the {} driver was selected",
            descriptor.mode(),
            expected
        ),
        ErrorContext::new()
            .with_field_path("connection.mode")
            .with_source("driver"),
    )
}
