//! Connection builder: turns loader parameters into an immutable
//! [`ConnectionDescriptor`].
//!
//! This layer is pure validation plus string derivation. It performs no I/O.

pub mod builder;
pub mod descriptor;

pub use builder::{build, ConnectionBuilder, ConnectionParams};
pub use descriptor::{ConnectionDescriptor, ModeSettings};

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Region used when the caller leaves it blank.
pub const DEFAULT_REGION: &str = "cn-beijing";

/// Chat completions path appended to the base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Calling convention used to reach the model deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiMode {
    /// OpenAI-compatible chat-completions client convention.
    #[serde(rename = "OpenAPI")]
    OpenApiCompatible,
    /// Hand-built REST/JSON request against the Ark HTTP API.
    #[serde(rename = "REST API")]
    Rest,
}

impl ApiMode {
    /// Host-facing spelling of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenApiCompatible => "OpenAPI",
            Self::Rest => "REST API",
        }
    }

    /// Default base URL for this mode in `region`.
    pub fn default_base_url(&self, region: &str) -> String {
        match self {
            Self::OpenApiCompatible => format!("https://ark.{}.volcengine.com/v1", region),
            Self::Rest => format!("https://ark.{}.volces.com/api/v3", region),
        }
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "openapi" | "openai" | "openai-compatible" | "openapi-compatible" => {
                Ok(Self::OpenApiCompatible)
            }
            "rest api" | "rest" | "rest-api" => Ok(Self::Rest),
            _ => Err(Error::configuration(
                format!(
                    "unrecognized api mode '{}', expected \"OpenAPI\" or \"REST API\"",
                    s
                ),
                ErrorContext::new()
                    .with_field_path("connection.api_mode")
                    .with_source("connection_builder"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_host_spellings() {
        assert_eq!("OpenAPI".parse::<ApiMode>().unwrap(), ApiMode::OpenApiCompatible);
        assert_eq!("REST API".parse::<ApiMode>().unwrap(), ApiMode::Rest);
        assert_eq!(" rest ".parse::<ApiMode>().unwrap(), ApiMode::Rest);
        assert_eq!("openai".parse::<ApiMode>().unwrap(), ApiMode::OpenApiCompatible);
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let err = "gRPC".parse::<ApiMode>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_as_str_round_trips() {
        for mode in [ApiMode::OpenApiCompatible, ApiMode::Rest] {
            assert_eq!(mode.as_str().parse::<ApiMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_default_base_urls_follow_region() {
        assert_eq!(
            ApiMode::OpenApiCompatible.default_base_url("cn-shanghai"),
            "https://ark.cn-shanghai.volcengine.com/v1"
        );
        assert_eq!(
            ApiMode::Rest.default_base_url("cn-beijing"),
            "https://ark.cn-beijing.volces.com/api/v3"
        );
    }
}
