//! OpenAI-compatible chat-completions driver.
//!
//! Requests and responses go through typed structs, the way an OpenAI client
//! library would shape them: `POST {base_url}/chat/completions` with
//! `model = endpoint_id`. Deserialization is strict about the envelope
//! (`choices` must be a list of objects); fields inside it that are null or of
//! the wrong type are treated as absent, matching the REST driver.

use serde::{Deserialize, Serialize};

use super::{join_url, lenient, mode_mismatch, parse_json_body, DriverRequest, ProtocolDriver};
use crate::connection::{ApiMode, ConnectionDescriptor, ModeSettings, CHAT_COMPLETIONS_PATH};
use crate::types::{ChatMessage, NormalizedResult, PromptRequest, StreamEvent, UsageInfo};
use crate::{Error, ErrorContext, Result};

const SOURCE: &str = "openapi_driver";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default, deserialize_with = "lenient")]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default, deserialize_with = "lenient")]
    message: Option<ResponseMessage>,
    #[serde(default, deserialize_with = "lenient")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default, deserialize_with = "lenient")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default, deserialize_with = "lenient")]
    choices: Option<Vec<ChunkChoice>>,
    #[serde(default, deserialize_with = "lenient")]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default, deserialize_with = "lenient")]
    delta: Option<Delta>,
    #[serde(default, deserialize_with = "lenient")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default, deserialize_with = "lenient")]
    content: Option<String>,
}

/// OpenAI-compatible driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenApiDriver;

impl ProtocolDriver for OpenApiDriver {
    fn mode(&self) -> ApiMode {
        ApiMode::OpenApiCompatible
    }

    fn build_request(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
        stream: bool,
    ) -> Result<DriverRequest> {
        if !matches!(descriptor.settings(), ModeSettings::OpenApiCompatible) {
            return Err(mode_mismatch(descriptor, self.mode()));
        }
        request.validate()?;

        let url = join_url(descriptor.base_url(), CHAT_COMPLETIONS_PATH)?;
        let body = ChatCompletionRequest {
            model: descriptor.endpoint_id(),
            messages: request.messages(),
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            stop: request.stop.as_deref(),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        };
        let body = serde_json::to_value(&body).map_err(|e| {
            Error::validation(
                format!("failed to encode request: {}", e),
                ErrorContext::new().with_source(SOURCE),
            )
        })?;

        Ok(DriverRequest {
            url,
            headers: Vec::new(),
            body,
            stream,
        })
    }

    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResult> {
        let value = parse_json_body(body, SOURCE)?;
        let resp: ChatCompletionResponse = serde_json::from_value(value).map_err(|e| {
            Error::response_format(
                "unexpected chat completion shape",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })?;

        let choice = resp.choices.into_iter().next().ok_or_else(|| {
            Error::response_format(
                "response contained no choices",
                ErrorContext::new()
                    .with_field_path("choices")
                    .with_source(SOURCE),
            )
        })?;

        Ok(NormalizedResult {
            response_text: choice.message.and_then(|m| m.content).unwrap_or_default(),
            usage_info: resp.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            response_id: resp.id,
            model: resp.model,
        })
    }

    fn parse_stream_chunk(&self, data: &str) -> Result<Vec<StreamEvent>> {
        if data.trim().is_empty() || self.is_stream_done(data) {
            return Ok(Vec::new());
        }
        let chunk: ChatCompletionChunk = serde_json::from_str(data).map_err(|e| {
            Error::response_format(
                "malformed stream chunk",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })?;

        let mut events = Vec::new();
        if let Some(choice) = chunk.choices.unwrap_or_default().into_iter().next() {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                if !content.is_empty() {
                    events.push(StreamEvent::ContentDelta { content });
                }
            }
            if let Some(reason) = choice.finish_reason {
                events.push(StreamEvent::Finish {
                    finish_reason: reason,
                });
            }
        }
        if let Some(usage) = chunk.usage {
            events.push(StreamEvent::Usage { usage });
        }
        Ok(events)
    }
}
