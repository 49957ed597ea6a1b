//! # volcano-llm
//!
//! Connector between a node-based workflow host and Volcano Engine Ark chat
//! model endpoints.
//!
//! ## Overview
//!
//! Two components, composed one way:
//!
//! - **Connection builder**: validates endpoint identity, credential, region and
//!   base URL into an immutable [`ConnectionDescriptor`] for one [`ApiMode`].
//! - **Dispatcher**: takes a descriptor and a [`PromptRequest`], builds the
//!   mode-specific request, sends it and returns a [`NormalizedResult`] whose
//!   shape does not depend on the mode.
//!
//! Two calling conventions are supported: the OpenAI-compatible chat-completion
//! convention and a hand-built REST JSON exchange. Each is one
//! [`drivers::ProtocolDriver`]; nothing else in the call path branches on mode.
//!
//! Failures are classified into five kinds ([`ErrorKind`]): configuration,
//! validation, authentication, transport and response format. The connector
//! never retries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use volcano_llm::{build, Dispatcher, PromptRequest};
//!
//! #[tokio::main]
//! async fn main() -> volcano_llm::Result<()> {
//!     let connection = build("OpenAPI", "ep-20240101-abcde", "your-api-key", None, None)?;
//!     let dispatcher = Dispatcher::new()?;
//!
//!     let request = PromptRequest::new("Describe a volcano in one sentence.")
//!         .system_prompt("You are concise.");
//!     let result = dispatcher.send(&connection, &request).await?;
//!
//!     println!("{}", result.response_text);
//!     println!("{}", result.info());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | API modes, connection builder and descriptor |
//! | [`dispatch`] | Async/blocking dispatchers, streaming, error classification |
//! | [`drivers`] | Per-mode request construction and response parsing |
//! | [`node`] | Host-boundary parameter parsing for loader and prompt nodes |
//! | [`transport`] | Pooled HTTP client and its configuration |
//! | [`types`] | Requests, messages, attachments and results |

pub mod connection;
pub mod dispatch;
pub mod drivers;
pub mod error_code;
pub mod node;
pub mod transport;
pub mod types;

pub use connection::{build, ApiMode, ConnectionBuilder, ConnectionDescriptor, ConnectionParams};
pub use dispatch::{collect_stream, BlockingDispatcher, ChatDispatch, Dispatcher};
pub use drivers::parse;
pub use node::{run_prompt, ConnectionHandle, LoaderParams, PromptOutput, PromptParams};
pub use transport::TransportConfig;
pub use types::{
    Attachment, ChatMessage, MediaKind, NormalizedResult, PromptRequest, StreamEvent, UsageInfo,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
