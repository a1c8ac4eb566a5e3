//! Core domain types and the request-normalization boundary

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Media classification for a relayed file
///
/// Used to pick the scratch-file suffix (so downstream consumers can infer
/// the type from the extension alone) and the platform upload operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video file, delivered via the platform's video upload
    #[default]
    Video,
    /// Photo file, delivered via the platform's photo upload
    Photo,
}

impl MediaKind {
    /// Filename suffix for scratch files of this kind
    pub fn suffix(&self) -> &'static str {
        match self {
            MediaKind::Video => ".mp4",
            MediaKind::Photo => ".jpg",
        }
    }

    /// Lenient parse of the wire value. Missing values mean video (the
    /// dominant caller default); unrecognized values are logged and also
    /// fall back to video rather than failing the request.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            None => MediaKind::Video,
            Some(s) if s.is_empty() || s == "video" => MediaKind::Video,
            Some(s) if s == "photo" => MediaKind::Photo,
            Some(other) => {
                tracing::warn!(kind = %other, "unrecognized media kind, defaulting to video");
                MediaKind::Video
            }
        }
    }
}

/// Caption text-styling mode
///
/// Callers send this as a loosely quoted string; [`ParseMode::from_raw`]
/// normalizes it once at the boundary. Unrecognized values degrade to
/// plain text instead of failing the call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ParseMode {
    /// No styling applied to the caption
    #[default]
    Plain,
    /// HTML-tagged caption
    Html,
    /// Markdown-tagged caption
    Markdown,
}

impl ParseMode {
    /// Normalize a raw wire value.
    ///
    /// Strips one layer of matching single or double quotes (some callers
    /// double-encode), folds case, and accepts any `Markdown*` spelling
    /// (e.g. `MarkdownV2`). Everything else maps to [`ParseMode::Plain`].
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ParseMode::Plain;
        };
        let mut s = raw.trim();
        if s.len() >= 2
            && ((s.starts_with('"') && s.ends_with('"'))
                || (s.starts_with('\'') && s.ends_with('\'')))
        {
            s = s[1..s.len() - 1].trim();
        }
        let upper = s.to_ascii_uppercase();
        if upper == "HTML" {
            ParseMode::Html
        } else if upper.starts_with("MARKDOWN") {
            ParseMode::Markdown
        } else {
            ParseMode::Plain
        }
    }

    /// The value sent to the platform API, if any
    pub fn as_api_value(&self) -> Option<&'static str> {
        match self {
            ParseMode::Plain => None,
            ParseMode::Html => Some("HTML"),
            ParseMode::Markdown => Some("Markdown"),
        }
    }
}

/// Identifier of a message created by the messaging platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire shape of a `POST /upload` body, exactly as callers send it
///
/// Callers are browser userscripts and automation nodes with loose typing:
/// the source URL arrives as `file_url` or `url`, `parse_mode` may carry
/// stray quotes, and `kind` is an optional free-form string. This struct
/// accepts all of that; [`RawUploadRequest::normalize`] turns it into the
/// strongly-typed [`UploadRequest`] before any core logic runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RawUploadRequest {
    /// Destination chat: numeric id or @username
    pub chat_id: Option<String>,
    /// Source URL of the media file
    pub file_url: Option<String>,
    /// Alias some callers send instead of `file_url`
    pub url: Option<String>,
    /// Optional caption attached to the delivered media
    pub caption: Option<String>,
    /// Caption styling: "HTML", "Markdown" (any quoting/case) or absent
    pub parse_mode: Option<String>,
    /// "video" (default) or "photo"
    pub kind: Option<String>,
}

impl RawUploadRequest {
    /// Map the untyped wire shape to a validated request.
    ///
    /// Pure and total over its input: the only failures are genuinely
    /// unusable requests (no destination, no source URL). Leniency rules
    /// for `parse_mode` and `kind` live on their respective types.
    pub fn normalize(self) -> Result<UploadRequest> {
        let destination = self
            .chat_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Validation("chat_id is required".to_string()))?;

        let source_url = self
            .file_url
            .or(self.url)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Validation("file_url is required".to_string()))?;

        Ok(UploadRequest {
            destination,
            source_url,
            caption: self.caption.filter(|c| !c.is_empty()),
            parse_mode: ParseMode::from_raw(self.parse_mode.as_deref()),
            kind: MediaKind::from_raw(self.kind.as_deref()),
        })
    }
}

/// Validated upload request produced by [`RawUploadRequest::normalize`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    /// Destination chat identifier
    pub destination: String,
    /// Source URL of the media file (scheme still unvalidated; the
    /// fetcher owns URL validation)
    pub source_url: String,
    /// Optional caption
    pub caption: Option<String>,
    /// Caption styling mode
    pub parse_mode: ParseMode,
    /// Media classification
    pub kind: MediaKind,
}
