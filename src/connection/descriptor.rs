use super::ApiMode;
use secrecy::SecretString;

/// Mode-specific settings. Code touching these must branch on the mode first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSettings {
    /// OpenAI-compatible client convention: the chat path is fixed by the convention.
    OpenApiCompatible,
    /// Raw REST: the chat path may be overridden per connection.
    Rest { chat_path: String },
}

impl ModeSettings {
    pub fn mode(&self) -> ApiMode {
        match self {
            ModeSettings::OpenApiCompatible => ApiMode::OpenApiCompatible,
            ModeSettings::Rest { .. } => ApiMode::Rest,
        }
    }
}

/// Immutable bundle identifying the deployment, credential and protocol mode.
///
/// Holds no mutable state, so one descriptor can back any number of concurrent
/// dispatches. The API key is kept as a [`SecretString`]; `Debug` output redacts it.
#[derive(Debug)]
pub struct ConnectionDescriptor {
    pub(crate) settings: ModeSettings,
    pub(crate) endpoint_id: String,
    pub(crate) api_key: SecretString,
    pub(crate) base_url: String,
    pub(crate) region: String,
}

impl ConnectionDescriptor {
    pub fn mode(&self) -> ApiMode {
        self.settings.mode()
    }

    pub fn settings(&self) -> &ModeSettings {
        &self.settings
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Region the default base URL was (or would have been) derived from.
    pub fn region(&self) -> &str {
        &self.region
    }

    pub(crate) fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}
