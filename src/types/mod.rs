//! Strongly-typed request, message and result structures.
//!
//! Host parameters are converted into these types at the boundary; nothing
//! below this layer handles untyped maps.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`attachment`] | Image/video attachments and their encoding |
//! | [`message`] | Chat messages with multimodal content parts |
//! | [`request`] | [`PromptRequest`] and sampling defaults |
//! | [`response`] | [`NormalizedResult`] and [`UsageInfo`] |
//! | [`events`] | Streaming events |

pub mod attachment;
pub mod events;
pub mod message;
pub mod request;
pub mod response;

pub use attachment::{Attachment, AttachmentSource, MediaKind};
pub use events::StreamEvent;
pub use message::{ChatMessage, ContentPart, MessageContent, MessageRole};
pub use request::{PromptRequest, SamplingParams};
pub use response::{NormalizedResult, UsageInfo};
