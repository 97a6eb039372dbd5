use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Result, TriageError};

/// An image the completion endpoint can dereference.
///
/// Network locators are passed through untouched; local files and raw bytes
/// are inlined as base64 `data:` URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// `http(s)://` or `data:` URL
    Url(String),
    /// Base64-encoded bytes with their MIME type
    Inline { mime_type: String, data: String },
}

impl ImageRef {
    /// Use a network-accessible image. Only `http`, `https` and `data` URLs are accepted.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let trimmed = url.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("https://") || lower.starts_with("http://") {
            Ok(ImageRef::Url(trimmed.to_string()))
        } else if lower.starts_with("data:image/") && trimmed.contains(";base64,") {
            Ok(ImageRef::Url(trimmed.to_string()))
        } else {
            Err(TriageError::InvalidImage(format!(
                "unsupported image URL {:?}, expected http(s):// or data:image/...;base64,",
                url
            )))
        }
    }

    /// Inline raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self> {
        let mime_type = mime_type.into();
        if bytes.is_empty() {
            return Err(TriageError::InvalidImage(
                "image data cannot be empty".to_string(),
            ));
        }
        if !mime_type.starts_with("image/") {
            return Err(TriageError::InvalidImage(format!(
                "unsupported MIME type {:?}",
                mime_type
            )));
        }
        Ok(ImageRef::Inline {
            mime_type,
            data: STANDARD.encode(bytes),
        })
    }

    /// Read a local image file and inline it. The MIME type comes from the extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = mime_type_for(path).ok_or_else(|| {
            TriageError::InvalidImage(format!(
                "cannot infer image type of {}, expected .jpg, .jpeg, .png, .gif or .webp",
                path.display()
            ))
        })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TriageError::InvalidImage(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(bytes = bytes.len(), mime_type, "Read local image");
        Self::from_bytes(&bytes, mime_type)
    }

    /// Interpret a command-line argument: URLs are used as-is, anything else is a file path.
    pub async fn resolve(reference: &str) -> Result<Self> {
        if reference.contains("://") || reference.starts_with("data:") {
            Self::from_url(reference)
        } else {
            Self::from_path(reference).await
        }
    }

    /// URL to put in the `image_url` content part.
    pub fn to_url(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::Inline { mime_type, data } => format!("data:{};base64,{}", mime_type, data),
        }
    }

    /// Short description for logs; never includes inline data.
    pub fn describe(&self) -> String {
        match self {
            ImageRef::Url(url) if url.starts_with("data:") => "inline data URL".to_string(),
            ImageRef::Url(url) => url.clone(),
            ImageRef::Inline { mime_type, data } => {
                format!("inline {} ({} base64 chars)", mime_type, data.len())
            }
        }
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub(crate) url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

/// Content of the single user message: the prompt text followed by the image.
pub(crate) fn build_content_parts(prompt: &str, image: &ImageRef) -> Vec<ContentPart> {
    vec![
        ContentPart::Text {
            text: prompt.to_string(),
        },
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_url(),
                detail: Some("high".to_string()),
            },
        },
    ]
}
