//! Normalized dispatch output, identical for both modes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Token counts that are null, negative or not numbers read as zero.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_u64).unwrap_or(0))
}

/// Token accounting. Field order is fixed so serialized output is reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    #[serde(default, deserialize_with = "count")]
    pub prompt_tokens: u64,
    #[serde(default, deserialize_with = "count")]
    pub completion_tokens: u64,
    #[serde(default, deserialize_with = "count")]
    pub total_tokens: u64,
}

impl UsageInfo {
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

/// Generated text plus usage metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Empty when the service returned no content.
    pub response_text: String,
    pub usage_info: UsageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Upstream response id, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    /// Model name reported by the service, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl NormalizedResult {
    /// Compact usage JSON for the host's informational `info` output.
    pub fn info(&self) -> String {
        serde_json::to_string(&self.usage_info).unwrap_or_default()
    }
}
