//! Per-invocation prompt payload.

use super::attachment::Attachment;
use super::message::ChatMessage;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Sampling parameters. Always sent; callers that omit them get the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

/// Prompt payload for a single dispatch. Built fresh per call, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub attachments: Vec<Attachment>,
    pub sampling: SamplingParams,
    pub stop: Option<Vec<String>>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            attachments: Vec::new(),
            sampling: SamplingParams::default(),
            stop: None,
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.sampling.top_p = top_p;
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// System prompt, if it carries any text.
    pub fn effective_system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Reject payloads the service would refuse, before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt must not be empty", "request.prompt", None));
        }
        let s = &self.sampling;
        if s.max_tokens == 0 {
            return Err(invalid(
                "max_tokens must be at least 1",
                "request.max_tokens",
                None,
            ));
        }
        if !s.temperature.is_finite() || !(0.0..=2.0).contains(&s.temperature) {
            return Err(invalid(
                "temperature must be within [0, 2]",
                "request.temperature",
                Some(s.temperature.to_string()),
            ));
        }
        if !s.top_p.is_finite() || s.top_p <= 0.0 || s.top_p > 1.0 {
            return Err(invalid(
                "top_p must be within (0, 1]",
                "request.top_p",
                Some(s.top_p.to_string()),
            ));
        }
        if let Some(stop) = &self.stop {
            if stop.iter().any(|s| s.is_empty()) {
                return Err(invalid(
                    "stop sequences must not be empty",
                    "request.stop",
                    None,
                ));
            }
        }
        for (idx, attachment) in self.attachments.iter().enumerate() {
            attachment.validate(idx)?;
        }
        Ok(())
    }

    /// Assemble the message list: optional system message, then the user message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.effective_system_prompt() {
            messages.push(ChatMessage::system(system));
        }
        if self.attachments.is_empty() {
            messages.push(ChatMessage::user(self.prompt.clone()));
        } else {
            messages.push(ChatMessage::user_with_attachments(
                self.prompt.clone(),
                &self.attachments,
            ));
        }
        messages
    }
}

fn invalid(msg: &str, field: &str, details: Option<String>) -> Error {
    let mut ctx = ErrorContext::new()
        .with_field_path(field)
        .with_source("request_validator");
    if let Some(d) = details {
        ctx = ctx.with_details(d);
    }
    Error::validation(msg, ctx)
}
