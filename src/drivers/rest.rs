//! REST driver: hand-built JSON request against `{base_url}/{chat_path}`.
//!
//! The body is assembled directly as JSON and the response is read through JSON
//! pointers. The provider's shape mirrors the OpenAI-compatible one, so the
//! same field names are used; a body without a non-empty `choices` list is a
//! format error, while missing content or usage inside a choice default to
//! empty/zero.

use serde_json::{json, Value};

use super::{join_url, mode_mismatch, parse_json_body, DriverRequest, ProtocolDriver};
use crate::connection::{ApiMode, ConnectionDescriptor, ModeSettings};
use crate::types::{NormalizedResult, PromptRequest, StreamEvent, UsageInfo};
use crate::{Error, ErrorContext, Result};

const SOURCE: &str = "rest_driver";

/// REST driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestDriver;

fn usage_from(value: Option<&Value>) -> UsageInfo {
    let field = |name: &str| {
        value
            .and_then(|u| u.get(name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    UsageInfo {
        prompt_tokens: field("prompt_tokens"),
        completion_tokens: field("completion_tokens"),
        total_tokens: field("total_tokens"),
    }
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(String::from)
}

impl ProtocolDriver for RestDriver {
    fn mode(&self) -> ApiMode {
        ApiMode::Rest
    }

    fn build_request(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
        stream: bool,
    ) -> Result<DriverRequest> {
        let chat_path = match descriptor.settings() {
            ModeSettings::Rest { chat_path } => chat_path,
            ModeSettings::OpenApiCompatible => return Err(mode_mismatch(descriptor, self.mode())),
        };
        request.validate()?;

        let url = join_url(descriptor.base_url(), chat_path)?;
        let messages = serde_json::to_value(request.messages()).map_err(|e| {
            Error::validation(
                format!("failed to encode messages: {}", e),
                ErrorContext::new()
                    .with_field_path("request.messages")
                    .with_source(SOURCE),
            )
        })?;

        let mut body = json!({
            "model": descriptor.endpoint_id(),
            "messages": messages,
            "max_tokens": request.sampling.max_tokens,
            "temperature": request.sampling.temperature,
            "top_p": request.sampling.top_p,
        });
        if let Some(stop) = &request.stop {
            body["stop"] = json!(stop);
        }
        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({ "include_usage": true });
        }

        // Streaming requests get an event-stream Accept from the transport.
        let headers = if stream {
            Vec::new()
        } else {
            vec![("accept", "application/json")]
        };

        Ok(DriverRequest {
            url,
            headers,
            body,
            stream,
        })
    }

    fn parse_response(&self, body: &[u8]) -> Result<NormalizedResult> {
        let value = parse_json_body(body, SOURCE)?;

        let first = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .filter(|choice| choice.is_object())
            .ok_or_else(|| {
                Error::response_format(
                    "response has no choices",
                    ErrorContext::new()
                        .with_field_path("choices")
                        .with_source(SOURCE),
                )
            })?;

        Ok(NormalizedResult {
            response_text: str_at(first, "/message/content").unwrap_or_default(),
            usage_info: usage_from(value.get("usage")),
            finish_reason: str_at(first, "/finish_reason"),
            response_id: str_at(&value, "/id"),
            model: str_at(&value, "/model"),
        })
    }

    fn parse_stream_chunk(&self, data: &str) -> Result<Vec<StreamEvent>> {
        if data.trim().is_empty() || self.is_stream_done(data) {
            return Ok(Vec::new());
        }
        let v: Value = serde_json::from_str(data).map_err(|e| {
            Error::response_format(
                "malformed stream chunk",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })?;

        let mut events = Vec::new();
        if let Some(content) = v.pointer("/choices/0/delta/content").and_then(Value::as_str) {
            if !content.is_empty() {
                events.push(StreamEvent::ContentDelta {
                    content: content.to_string(),
                });
            }
        }
        if let Some(reason) = str_at(&v, "/choices/0/finish_reason") {
            events.push(StreamEvent::Finish {
                finish_reason: reason,
            });
        }
        if let Some(usage) = v.get("usage").filter(|u| u.is_object()) {
            events.push(StreamEvent::Usage {
                usage: usage_from(Some(usage)),
            });
        }
        Ok(events)
    }
}
