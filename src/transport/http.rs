use crate::transport::TransportError;
use crate::{Error, ErrorContext, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Proxy, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 32;
const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Header carrying our own correlation id. The service may ignore it.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-client-request-id";

/// Settings for the shared HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Bound on a whole non-streaming call. For a stream, bound on receiving
    /// the response headers and on each gap between body chunks.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT_SECS),
            proxy: None,
        }
    }
}

impl TransportConfig {
    /// Production defaults, overridable through `VOLCANO_HTTP_*` / `VOLCANO_PROXY_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env_u64("VOLCANO_HTTP_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: env_u64("VOLCANO_HTTP_CONNECT_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: env::var("VOLCANO_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: env_u64("VOLCANO_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
            proxy: env::var("VOLCANO_PROXY_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

/// Pooled HTTP client. Credentials are passed per call and never stored.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .user_agent(concat!("volcano-llm/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = &config.proxy {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder.build().map_err(|e| {
            Error::configuration(
                format!("failed to build HTTP client: {}", e),
                ErrorContext::new().with_source("http_transport"),
            )
        })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// POST a JSON body with bearer auth.
    ///
    /// Non-streaming calls are bounded as a whole by the configured timeout. For
    /// streaming calls only the wait for response headers is bounded; the body is
    /// consumed incrementally by the caller.
    pub async fn post_json(
        &self,
        url: &str,
        api_key: &SecretString,
        body: &Value,
        extra_headers: &[(&'static str, &'static str)],
        client_request_id: &str,
        stream: bool,
    ) -> Result<Response> {
        let mut req = self
            .client
            .post(url)
            .bearer_auth(api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(CLIENT_REQUEST_ID_HEADER, client_request_id)
            .json(body);

        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }

        let timeout = self.config.timeout;
        if stream {
            req = req.header(ACCEPT, "text/event-stream");
            match tokio::time::timeout(timeout, req.send()).await {
                Ok(res) => res.map_err(|e| Error::Transport(TransportError::from_reqwest(e, timeout))),
                Err(_) => Err(Error::Transport(TransportError::Timeout(timeout))),
            }
        } else {
            req.timeout(timeout)
                .send()
                .await
                .map_err(|e| Error::Transport(TransportError::from_reqwest(e, timeout)))
        }
    }

    /// GET with bearer auth, bounded by the configured timeout.
    pub async fn get(&self, url: &str, api_key: &SecretString) -> Result<Response> {
        let timeout = self.config.timeout;
        self.client
            .get(url)
            .bearer_auth(api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::from_reqwest(e, timeout)))
    }

    /// Read a full response body within the configured timeout.
    pub async fn read_body(&self, resp: Response) -> Result<bytes::Bytes> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, resp.bytes()).await {
            Ok(res) => res.map_err(|e| Error::Transport(TransportError::from_reqwest(e, timeout))),
            Err(_) => Err(Error::Transport(TransportError::Timeout(timeout))),
        }
    }
}
