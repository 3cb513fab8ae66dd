//! Wire types for the story service REST API.
//!
//! Field names follow the service's JSON (camelCase); the serde renames map
//! them onto Rust conventions. Every response carries the `{error, message}`
//! envelope; the flag is authoritative even on 2xx responses.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A story as it appears on the wire.
///
/// Identity is the `id`; two stories with equal ids but different fields are
/// the same story with changed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Unique story identifier assigned by the service.
    pub id: String,
    /// Display name of the author.
    pub name: String,
    /// Story text.
    pub description: String,
    /// URL of the uploaded photo, when present.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// RFC 3339 creation timestamp as sent by the service.
    pub created_at: String,
    /// Latitude, when the story was geo-tagged.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude, when the story was geo-tagged.
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Story {
    /// Whether the story carries usable coordinates.
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// Response envelope for `/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Credential payload inside a successful `/login` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

/// Response envelope for `/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub login_result: Option<LoginResult>,
}

/// Response envelope for `GET /stories`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub list_story: Vec<Story>,
}

/// Response envelope for `GET /stories/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub story: Option<Story>,
}

/// Response envelope for `POST /stories` (upload).
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `location` query flag on `GET /stories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMode {
    /// All stories, coordinates optional.
    #[default]
    Any,
    /// Only stories that carry coordinates.
    Required,
}

impl LocationMode {
    /// Wire representation (the service takes 0/1).
    pub fn as_query(&self) -> &'static str {
        match self {
            LocationMode::Any => "0",
            LocationMode::Required => "1",
        }
    }
}

/// A photo to upload with a new story.
///
/// `Debug` omits the payload; photo bytes are large and uninteresting in
/// logs.
#[derive(Clone)]
pub struct PhotoPart {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl PhotoPart {
    /// Create a JPEG photo part, the format the capture pipeline produces.
    pub fn jpeg(file_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}

impl fmt::Debug for PhotoPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoPart")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}
