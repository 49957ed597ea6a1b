//! Streaming events

use super::response::UsageInfo;
use serde::{Deserialize, Serialize};

/// Event decoded from one streamed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum StreamEvent {
    /// Partial content delta (text streaming)
    ContentDelta { content: String },

    /// The model stopped generating.
    Finish { finish_reason: String },

    /// Token usage, usually on the last chunk.
    Usage { usage: UsageInfo },
}
