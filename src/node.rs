//! Host boundary for the loader and prompt nodes.
//!
//! The workflow host hands over loosely-typed parameter maps. They are
//! deserialized here into [`LoaderParams`] / [`PromptParams`] and immediately
//! converted into [`ConnectionDescriptor`] / [`PromptRequest`]; nothing past
//! this module sees an untyped map.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::{build, ConnectionDescriptor};
use crate::dispatch::ChatDispatch;
use crate::types::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use crate::types::{Attachment, PromptRequest};
use crate::{Error, ErrorContext, Result};

fn default_api_mode() -> String {
    "OpenAPI".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

/// Loader node inputs.
#[derive(Clone, Deserialize)]
pub struct LoaderParams {
    #[serde(default = "default_api_mode")]
    pub api_mode: String,
    #[serde(default)]
    pub endpoint_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub custom_base_url: Option<String>,
}

impl fmt::Debug for LoaderParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderParams")
            .field("api_mode", &self.api_mode)
            .field("endpoint_id", &self.endpoint_id)
            .field("api_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("custom_base_url", &self.custom_base_url)
            .finish()
    }
}

impl LoaderParams {
    /// Parse the host's parameter map. Wrong types are configuration errors.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            Error::configuration(
                "invalid loader parameters",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("loader_node"),
            )
        })
    }

    /// Validate and build the connection handle.
    pub fn load(&self) -> Result<ConnectionHandle> {
        let descriptor = build(
            &self.api_mode,
            &self.endpoint_id,
            &self.api_key,
            self.region.as_deref(),
            self.custom_base_url.as_deref(),
        )?;
        Ok(ConnectionHandle::from(descriptor))
    }
}

/// Opaque connection handle passed from the loader to prompt nodes.
#[derive(Debug, Clone)]
pub struct ConnectionHandle(Arc<ConnectionDescriptor>);

impl From<ConnectionDescriptor> for ConnectionHandle {
    fn from(descriptor: ConnectionDescriptor) -> Self {
        Self(Arc::new(descriptor))
    }
}

impl Deref for ConnectionHandle {
    type Target = ConnectionDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Prompt node inputs. Attachments arrive separately, already encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptParams {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub stop: Option<Vec<String>>,
}

impl PromptParams {
    /// Parse the host's parameter map. Wrong types are validation errors.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            Error::validation(
                "invalid prompt parameters",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("prompt_node"),
            )
        })
    }

    pub fn into_request(self, attachments: Vec<Attachment>) -> PromptRequest {
        let mut request = PromptRequest::new(self.prompt)
            .attachments(attachments)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .top_p(self.top_p);
        if let Some(system) = self.system_prompt {
            request = request.system_prompt(system);
        }
        if let Some(stop) = self.stop {
            request = request.stop(stop);
        }
        request
    }
}

/// Prompt node outputs: both populated, or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptOutput {
    pub response: String,
    pub info: String,
}

/// Run one prompt node invocation.
pub async fn run_prompt<D>(
    dispatcher: &D,
    handle: &ConnectionHandle,
    params: PromptParams,
    attachments: Vec<Attachment>,
) -> Result<PromptOutput>
where
    D: ChatDispatch + ?Sized,
{
    let request = params.into_request(attachments);
    let result = dispatcher.send(handle, &request).await?;
    let info = result.info();
    Ok(PromptOutput {
        response: result.response_text,
        info,
    })
}
