//! Synchronous facade over [`Dispatcher`] for hosts without an async runtime.

use tokio::runtime::{Builder, Runtime};

use super::Dispatcher;
use crate::connection::ConnectionDescriptor;
use crate::transport::{TransportConfig, TransportError};
use crate::types::{NormalizedResult, PromptRequest};
use crate::{Error, Result};

/// Blocking dispatcher backed by its own current-thread runtime.
///
/// Calls block the current thread until the request completes. Must not be
/// used from inside an async context.
#[derive(Debug)]
pub struct BlockingDispatcher {
    inner: Dispatcher,
    runtime: Runtime,
}

impl BlockingDispatcher {
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::from_env())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(format!("failed to start runtime: {}", e))))?;
        Ok(Self {
            inner: Dispatcher::with_config(config)?,
            runtime,
        })
    }

    pub fn send(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<NormalizedResult> {
        self.runtime.block_on(self.inner.send(descriptor, request))
    }

    /// Send a streaming request and fold the events into one result.
    pub fn send_collected(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &PromptRequest,
    ) -> Result<NormalizedResult> {
        self.runtime.block_on(async {
            let events = self.inner.send_stream(descriptor, request).await?;
            super::collect_stream(events).await
        })
    }

    pub fn list_models(&self, descriptor: &ConnectionDescriptor) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.list_models(descriptor))
    }

    pub fn check_connection(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        self.runtime.block_on(self.inner.check_connection(descriptor))
    }

    /// The async dispatcher this facade drives.
    pub fn inner(&self) -> &Dispatcher {
        &self.inner
    }
}
