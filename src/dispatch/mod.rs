//! Request dispatch: one call in, one [`NormalizedResult`] (or one classified
//! [`Error`]) out.
//!
//! The [`Dispatcher`] owns the pooled HTTP transport and is cheap to clone.
//! Per call it picks the driver for the descriptor's mode, validates and builds
//! the request, sends it, classifies non-2xx statuses and hands 2xx bodies to
//! the driver for parsing. No retries are performed; [`Error::is_transient`]
//! and [`ErrorClass::retryable`](crate::error_code::ErrorClass::retryable) are
//! hints for callers that want their own policy.

pub mod blocking;
pub mod error_classification;
pub mod stream;

pub use blocking::BlockingDispatcher;
pub use stream::collect_stream;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::ConnectionDescriptor;
use crate::drivers::{driver_for, join_url};
use crate::transport::{HttpTransport, TransportConfig, TransportError};
use crate::types::{NormalizedResult, PromptRequest, StreamEvent};
use crate::{BoxStream, Error, ErrorContext, Result};
use error_classification::classify_status;

const MODELS_PATH: &str = "models";
const UPSTREAM_ID_HEADERS: &[&str] = &["x-request-id", "x-tt-logid", "request-id"];

fn upstream_request_id(headers: &HeaderMap) -> Option<String> {
    UPSTREAM_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    })
}

/// Seam between host glue and the network; implemented by [`Dispatcher`].
#[async_trait]
pub trait ChatDispatch: Send + Sync {
    async fn send(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<NormalizedResult>;
}

/// Async dispatcher for both API modes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<HttpTransport>,
}

impl Dispatcher {
    /// Dispatcher with transport settings read from the environment.
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::from_env())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(config)?),
        })
    }

    pub fn transport_config(&self) -> &TransportConfig {
        self.transport.config()
    }

    /// Send one prompt and wait for the complete answer.
    pub async fn send(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<NormalizedResult> {
        let driver = driver_for(descriptor.mode());
        let req = driver.build_request(descriptor, request, false)?;
        let client_request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        debug!(
            mode = descriptor.mode().as_str(),
            endpoint_id = descriptor.endpoint_id(),
            url = req.url.as_str(),
            attachments = request.attachments.len(),
            client_request_id = client_request_id.as_str(),
            "dispatching chat request"
        );

        let resp = self
            .transport
            .post_json(
                &req.url,
                descriptor.api_key(),
                &req.body,
                &req.headers,
                &client_request_id,
                false,
            )
            .await
            .map_err(|e| {
                warn!(
                    mode = descriptor.mode().as_str(),
                    endpoint_id = descriptor.endpoint_id(),
                    client_request_id = client_request_id.as_str(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "chat request failed before a response arrived"
                );
                e
            })?;

        let status = resp.status().as_u16();
        let upstream = upstream_request_id(resp.headers());
        let success = resp.status().is_success();
        let body = self.transport.read_body(resp).await?;

        if !success {
            let err = classify_status(status, &String::from_utf8_lossy(&body));
            warn!(
                mode = descriptor.mode().as_str(),
                endpoint_id = descriptor.endpoint_id(),
                http_status = status,
                error_kind = err.kind().as_str(),
                client_request_id = client_request_id.as_str(),
                upstream_request_id = upstream.as_deref().unwrap_or(""),
                duration_ms = start.elapsed().as_millis() as u64,
                "chat request rejected"
            );
            return Err(err);
        }

        let result = driver.parse_response(&body).map_err(|e| {
            warn!(
                mode = descriptor.mode().as_str(),
                endpoint_id = descriptor.endpoint_id(),
                http_status = status,
                error_kind = e.kind().as_str(),
                upstream_request_id = upstream.as_deref().unwrap_or(""),
                "could not interpret chat response"
            );
            e
        })?;

        info!(
            mode = descriptor.mode().as_str(),
            endpoint_id = descriptor.endpoint_id(),
            http_status = status,
            client_request_id = client_request_id.as_str(),
            upstream_request_id = upstream.as_deref().unwrap_or(""),
            duration_ms = start.elapsed().as_millis() as u64,
            total_tokens = result.usage_info.total_tokens,
            finish_reason = result.finish_reason.as_deref().unwrap_or(""),
            "chat request completed"
        );
        Ok(result)
    }

    /// Like [`send`](Self::send), but gives up as soon as `token` is cancelled.
    ///
    /// Dropping the in-flight future aborts the HTTP request.
    pub async fn send_with_cancel(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
        token: CancellationToken,
    ) -> Result<NormalizedResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(
                    mode = descriptor.mode().as_str(),
                    endpoint_id = descriptor.endpoint_id(),
                    "chat request cancelled"
                );
                Err(Error::Transport(TransportError::Cancelled))
            }
            res = self.send(descriptor, request) => res,
        }
    }

    /// Send one prompt with `stream: true` and decode the SSE body.
    ///
    /// Errors before the first byte (validation, status, transport) are returned
    /// directly; later failures surface as stream items. A body that goes quiet
    /// for longer than the configured timeout ends with a timeout error.
    pub async fn send_stream(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<BoxStream<'static, StreamEvent>> {
        let driver = driver_for(descriptor.mode());
        let req = driver.build_request(descriptor, request, true)?;
        let client_request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let resp = self
            .transport
            .post_json(
                &req.url,
                descriptor.api_key(),
                &req.body,
                &req.headers,
                &client_request_id,
                true,
            )
            .await?;

        let status = resp.status().as_u16();
        let upstream = upstream_request_id(resp.headers());
        if !resp.status().is_success() {
            let body = self.transport.read_body(resp).await?;
            let err = classify_status(status, &String::from_utf8_lossy(&body));
            warn!(
                mode = descriptor.mode().as_str(),
                endpoint_id = descriptor.endpoint_id(),
                http_status = status,
                error_kind = err.kind().as_str(),
                upstream_request_id = upstream.as_deref().unwrap_or(""),
                duration_ms = start.elapsed().as_millis() as u64,
                "streaming request rejected"
            );
            return Err(err);
        }

        info!(
            mode = descriptor.mode().as_str(),
            endpoint_id = descriptor.endpoint_id(),
            http_status = status,
            client_request_id = client_request_id.as_str(),
            upstream_request_id = upstream.as_deref().unwrap_or(""),
            duration_ms = start.elapsed().as_millis() as u64,
            "streaming request started"
        );

        let bytes: BoxStream<'static, bytes::Bytes> = Box::pin(
            resp.bytes_stream()
                .map_err(|e| Error::Transport(TransportError::Http(e))),
        );
        Ok(stream::decode_sse(
            bytes,
            driver,
            self.transport.config().timeout,
        ))
    }

    /// Model ids visible to the descriptor's credentials (`GET {base_url}/models`).
    pub async fn list_models(&self, descriptor: &ConnectionDescriptor) -> Result<Vec<String>> {
        let url = join_url(descriptor.base_url(), MODELS_PATH)?;
        let resp = self.transport.get(&url, descriptor.api_key()).await?;
        let status = resp.status().as_u16();
        let success = resp.status().is_success();
        let body = self.transport.read_body(resp).await?;
        if !success {
            return Err(classify_status(status, &String::from_utf8_lossy(&body)));
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            Error::response_format(
                "model list is not valid JSON",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("list_models"),
            )
        })?;
        let data = value.get("data").and_then(Value::as_array).ok_or_else(|| {
            Error::response_format(
                "model list has no data array",
                ErrorContext::new()
                    .with_field_path("data")
                    .with_source("list_models"),
            )
        })?;
        Ok(data
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str).map(String::from))
            .collect())
    }

    /// Verify the endpoint is reachable and accepts the credentials.
    pub async fn check_connection(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        match self.list_models(descriptor).await {
            Ok(models) => {
                info!(
                    mode = descriptor.mode().as_str(),
                    base_url = descriptor.base_url(),
                    models = models.len(),
                    "connection check passed"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    mode = descriptor.mode().as_str(),
                    base_url = descriptor.base_url(),
                    error_kind = e.kind().as_str(),
                    error = %e,
                    "connection check failed"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ChatDispatch for Dispatcher {
    async fn send(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<NormalizedResult> {
        Dispatcher::send(self, descriptor, request).await
    }
}
