//! Chat message wire format shared by both dispatch modes.

use super::attachment::{Attachment, MediaKind};
use serde::{Deserialize, Serialize};

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message with one text part followed by one part per attachment, in order.
    pub fn user_with_attachments(text: impl Into<String>, attachments: &[Attachment]) -> Self {
        let mut parts = Vec::with_capacity(attachments.len() + 1);
        parts.push(ContentPart::text(text));
        parts.extend(attachments.iter().map(ContentPart::from_attachment));
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// Message content (plain string or array of content parts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    VideoUrl { video_url: MediaUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn from_attachment(attachment: &Attachment) -> Self {
        let url = MediaUrl {
            url: attachment.to_url(),
        };
        match attachment.kind {
            MediaKind::Image => ContentPart::ImageUrl { image_url: url },
            MediaKind::Video => ContentPart::VideoUrl { video_url: url },
        }
    }
}
