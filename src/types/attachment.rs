//! Multimodal attachments (images and videos) already encoded for transport.

use crate::{Error, ErrorContext, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    fn mime_prefix(&self) -> &'static str {
        match self {
            Self::Image => "image/",
            Self::Video => "video/",
        }
    }
}

/// Where the attachment payload lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Inline payload, standard base64 without a `data:` prefix.
    Base64 { media_type: String, data: String },
    /// Remote `http(s)` URL or a complete `data:` URI, sent as-is.
    Url { url: String },
}

/// A single image or video item in a multimodal prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: MediaKind,
    pub source: AttachmentSource,
}

impl Attachment {
    pub fn image_base64(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::base64(MediaKind::Image, data.into(), media_type.into())
    }

    pub fn video_base64(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::base64(MediaKind::Video, data.into(), media_type.into())
    }

    pub fn image_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::from_bytes(MediaKind::Image, bytes, media_type)
    }

    pub fn video_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::from_bytes(MediaKind::Video, bytes, media_type)
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source: AttachmentSource::Url { url: url.into() },
        }
    }

    pub fn video_url(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            source: AttachmentSource::Url { url: url.into() },
        }
    }

    pub fn from_bytes(kind: MediaKind, bytes: &[u8], media_type: impl Into<String>) -> Self {
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::base64(kind, data, media_type.into())
    }

    /// Load a file, inferring image or video from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let media_type = guess_media_type(path).ok_or_else(|| {
            Error::validation(
                "unsupported attachment file type",
                ErrorContext::new()
                    .with_field_path("attachment.path")
                    .with_details(path.display().to_string())
                    .with_source("attachment_loader"),
            )
        })?;
        let kind = if media_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        let bytes = std::fs::read(path).map_err(|e| {
            Error::validation(
                format!("failed to read attachment: {}", e),
                ErrorContext::new()
                    .with_field_path("attachment.path")
                    .with_details(path.display().to_string())
                    .with_source("attachment_loader"),
            )
        })?;
        Ok(Self::from_bytes(kind, &bytes, media_type))
    }

    fn base64(kind: MediaKind, data: String, media_type: String) -> Self {
        Self {
            kind,
            source: AttachmentSource::Base64 { media_type, data },
        }
    }

    /// URL placed in the content part: a `data:` URI for inline payloads.
    pub fn to_url(&self) -> String {
        match &self.source {
            AttachmentSource::Base64 { media_type, data } => {
                format!("data:{};base64,{}", media_type, data)
            }
            AttachmentSource::Url { url } => url.clone(),
        }
    }

    /// Check the payload can be encoded before anything is sent.
    ///
    /// `index` is the attachment's position, used only for the error path.
    pub fn validate(&self, index: usize) -> Result<()> {
        let field = format!("request.attachments[{}]", index);
        let fail = |msg: String| {
            Err(Error::validation(
                msg,
                ErrorContext::new()
                    .with_field_path(field.clone())
                    .with_source("attachment_validator"),
            ))
        };

        match &self.source {
            AttachmentSource::Base64 { media_type, data } => {
                if !media_type.starts_with(self.kind.mime_prefix()) {
                    return fail(format!(
                        "media type '{}' does not match {} attachment",
                        media_type,
                        self.kind.as_str()
                    ));
                }
                if data.trim().is_empty() {
                    return fail(format!("{} payload is empty", self.kind.as_str()));
                }
                if let Err(e) = base64::engine::general_purpose::STANDARD.decode(data.trim()) {
                    return fail(format!("{} payload is not valid base64: {}", self.kind.as_str(), e));
                }
            }
            AttachmentSource::Url { url } => {
                let url = url.trim();
                if url.is_empty() {
                    return fail(format!("{} url is empty", self.kind.as_str()));
                }
                let scheme_ok = url.starts_with("http://")
                    || url.starts_with("https://")
                    || url.starts_with(&format!("data:{}", self.kind.mime_prefix()));
                if !scheme_ok {
                    return fail(format!(
                        "{} url must be http(s) or a data:{}* URI",
                        self.kind.as_str(),
                        self.kind.mime_prefix()
                    ));
                }
            }
        }
        Ok(())
    }
}

fn guess_media_type(path: &Path) -> Option<String> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mt = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_bytes_become_data_uri() {
        let a = Attachment::image_bytes(b"png-bytes", "image/png");
        assert_eq!(a.to_url(), "data:image/png;base64,cG5nLWJ5dGVz");
        assert!(a.validate(0).is_ok());
    }

    #[test]
    fn test_url_passthrough() {
        let a = Attachment::video_url("https://example.com/clip.mp4");
        assert_eq!(a.to_url(), "https://example.com/clip.mp4");
        assert!(a.validate(0).is_ok());
    }

    #[test]
    fn test_mismatched_media_type_rejected() {
        let a = Attachment::video_base64("AAAA", "image/png");
        let err = a.validate(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.attachments[2]")
        );
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let a = Attachment::image_base64("not base64!!", "image/jpeg");
        assert_eq!(a.validate(0).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(Attachment::image_base64("", "image/png").validate(0).is_err());
        assert!(Attachment::image_url(" ").validate(0).is_err());
        assert!(Attachment::image_url("ftp://host/a.png").validate(0).is_err());
    }

    #[test]
    fn test_data_uri_must_match_kind() {
        assert!(Attachment::image_url("data:image/png;base64,AAAA").validate(0).is_ok());
        assert!(Attachment::video_url("data:image/png;base64,AAAA").validate(0).is_err());
    }

    #[test]
    fn test_from_file_infers_kind() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("volcano-llm-test-{}.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"\x00\x00\x00\x18ftyp").unwrap();
        let a = Attachment::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(a.kind, MediaKind::Video);
        assert!(a.to_url().starts_with("data:video/mp4;base64,"));
    }

    #[test]
    fn test_from_file_unknown_extension() {
        let err = Attachment::from_file("notes.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
