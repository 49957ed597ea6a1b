use super::{ApiMode, ConnectionDescriptor, ModeSettings, CHAT_COMPLETIONS_PATH, DEFAULT_REGION};
use crate::{Error, ErrorContext, Result};
use secrecy::SecretString;
use std::fmt;
use tracing::debug;

/// Loader parameters as two disjoint sets keyed by mode.
#[derive(Clone)]
pub enum ConnectionParams {
    OpenApi {
        endpoint_id: String,
        api_key: String,
        region: Option<String>,
        custom_base_url: Option<String>,
    },
    Rest {
        endpoint_id: String,
        api_key: String,
        region: Option<String>,
        custom_base_url: Option<String>,
        /// Overrides the default `chat/completions` path.
        chat_path: Option<String>,
    },
}

/// Builder for [`ConnectionDescriptor`].
///
/// Keep this surface small: identity, credential, where to send it.
#[derive(Clone)]
pub struct ConnectionBuilder {
    mode: ApiMode,
    endpoint_id: String,
    api_key: String,
    region: Option<String>,
    custom_base_url: Option<String>,
    chat_path: Option<String>,
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("mode", &self.mode)
            .field("endpoint_id", &self.endpoint_id)
            .field("api_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("custom_base_url", &self.custom_base_url)
            .field("chat_path", &self.chat_path)
            .finish()
    }
}

impl ConnectionBuilder {
    pub fn new(mode: ApiMode) -> Self {
        Self {
            mode,
            endpoint_id: String::new(),
            api_key: String::new(),
            region: None,
            custom_base_url: None,
            chat_path: None,
        }
    }

    pub fn from_params(params: ConnectionParams) -> Self {
        match params {
            ConnectionParams::OpenApi {
                endpoint_id,
                api_key,
                region,
                custom_base_url,
            } => Self {
                mode: ApiMode::OpenApiCompatible,
                endpoint_id,
                api_key,
                region,
                custom_base_url,
                chat_path: None,
            },
            ConnectionParams::Rest {
                endpoint_id,
                api_key,
                region,
                custom_base_url,
                chat_path,
            } => Self {
                mode: ApiMode::Rest,
                endpoint_id,
                api_key,
                region,
                custom_base_url,
                chat_path,
            },
        }
    }

    pub fn endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = endpoint_id.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// A custom base URL, stored verbatim, that wins over the derived default.
    ///
    /// An empty or whitespace-only value counts as unset, so the default for
    /// the mode and region is used instead.
    pub fn custom_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.custom_base_url = Some(base_url.into());
        self
    }

    /// Chat path for REST mode. Ignored in OpenAPI-compatible mode.
    pub fn rest_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ConnectionDescriptor> {
        let endpoint_id = require_non_empty(&self.endpoint_id, "connection.endpoint_id")?;
        let api_key = require_non_empty(&self.api_key, "connection.api_key")?;

        let region = non_blank(self.region.as_deref())
            .map(str::trim)
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let base_url = match non_blank(self.custom_base_url.as_deref()) {
            Some(custom) => custom.to_string(),
            None => self.mode.default_base_url(&region),
        };

        let settings = match self.mode {
            ApiMode::OpenApiCompatible => ModeSettings::OpenApiCompatible,
            ApiMode::Rest => ModeSettings::Rest {
                chat_path: non_blank(self.chat_path.as_deref())
                    .map(|p| p.trim().to_string())
                    .unwrap_or_else(|| CHAT_COMPLETIONS_PATH.to_string()),
            },
        };

        debug!(
            mode = %self.mode,
            endpoint_id = endpoint_id.as_str(),
            region = region.as_str(),
            base_url = base_url.as_str(),
            "connection descriptor built"
        );

        Ok(ConnectionDescriptor {
            settings,
            endpoint_id,
            api_key: SecretString::from(api_key),
            base_url,
            region,
        })
    }
}

/// Build a descriptor from the loader's raw inputs.
///
/// `mode` is the host spelling ("OpenAPI" / "REST API"); anything else is a
/// configuration error, as is an empty `endpoint_id` or `api_key`.
pub fn build(
    mode: &str,
    endpoint_id: &str,
    api_key: &str,
    region: Option<&str>,
    custom_base_url: Option<&str>,
) -> Result<ConnectionDescriptor> {
    let mode: ApiMode = mode.parse()?;
    let mut builder = ConnectionBuilder::new(mode)
        .endpoint_id(endpoint_id)
        .api_key(api_key);
    if let Some(region) = region {
        builder = builder.region(region);
    }
    if let Some(url) = custom_base_url {
        builder = builder.custom_base_url(url);
    }
    builder.build()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn require_non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::configuration(
            format!("{} must not be empty", field.rsplit('.').next().unwrap_or(field)),
            ErrorContext::new()
                .with_field_path(field)
                .with_source("connection_builder"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use secrecy::ExposeSecret;

    #[test]
    fn test_mode_is_never_substituted() {
        for mode in [ApiMode::OpenApiCompatible, ApiMode::Rest] {
            let d = ConnectionBuilder::new(mode)
                .endpoint_id("ep-1")
                .api_key("key")
                .build()
                .unwrap();
            assert_eq!(d.mode(), mode);
        }
    }

    #[test]
    fn test_custom_base_url_wins_verbatim() {
        let custom = "http://localhost:9000/proxy/";
        for mode in ["OpenAPI", "REST API"] {
            let d = build(mode, "ep-1", "key", Some("ap-southeast-1"), Some(custom)).unwrap();
            assert_eq!(d.base_url(), custom);
        }
    }

    #[test]
    fn test_default_base_url_from_region() {
        let d = build("OpenAPI", "ep-1", "key", Some("cn-shanghai"), None).unwrap();
        assert_eq!(d.base_url(), "https://ark.cn-shanghai.volcengine.com/v1");

        let d = build("REST API", "ep-1", "key", None, Some("   ")).unwrap();
        assert_eq!(d.base_url(), "https://ark.cn-beijing.volces.com/api/v3");
        assert_eq!(d.region(), DEFAULT_REGION);
    }

    #[test]
    fn test_custom_base_url_blank_falls_back_otherwise_verbatim() {
        let d = ConnectionBuilder::new(ApiMode::OpenApiCompatible)
            .endpoint_id("ep-1")
            .api_key("key")
            .custom_base_url("\t ")
            .build()
            .unwrap();
        assert_eq!(d.base_url(), "https://ark.cn-beijing.volcengine.com/v1");

        let d = ConnectionBuilder::new(ApiMode::OpenApiCompatible)
            .endpoint_id("ep-1")
            .api_key("key")
            .custom_base_url("https://proxy.internal/ark/v1/")
            .build()
            .unwrap();
        assert_eq!(d.base_url(), "https://proxy.internal/ark/v1/");
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let err = build("OpenAPI", "ep-1", "", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("connection.api_key")
        );
    }

    #[test]
    fn test_blank_endpoint_is_config_error() {
        let err = build("REST API", "  ", "key", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let err = build("SOAP", "ep-1", "key", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_values_are_trimmed_and_key_redacted() {
        let d = build("OpenAPI", " ep-1 ", " sk-secret\n", None, None).unwrap();
        assert_eq!(d.endpoint_id(), "ep-1");
        assert_eq!(d.api_key().expose_secret(), "sk-secret");
        assert!(!format!("{:?}", d).contains("sk-secret"));

        let builder = ConnectionBuilder::new(ApiMode::Rest).api_key("sk-secret");
        assert!(!format!("{:?}", builder).contains("sk-secret"));
    }

    #[test]
    fn test_rest_chat_path_override() {
        let d = ConnectionBuilder::from_params(ConnectionParams::Rest {
            endpoint_id: "ep-1".into(),
            api_key: "key".into(),
            region: None,
            custom_base_url: None,
            chat_path: Some("bots/chat/completions".into()),
        })
        .build()
        .unwrap();
        assert_eq!(
            d.settings(),
            &ModeSettings::Rest {
                chat_path: "bots/chat/completions".into()
            }
        );

        let d = ConnectionBuilder::new(ApiMode::OpenApiCompatible)
            .endpoint_id("ep-1")
            .api_key("key")
            .rest_chat_path("ignored")
            .build()
            .unwrap();
        assert_eq!(d.settings(), &ModeSettings::OpenApiCompatible);
    }
}
