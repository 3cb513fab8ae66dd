//! Story service API client.
//!
//! [`StoryApiClient`] implements the [`StoryApi`] trait over an
//! [`HttpClient`], translating the service's `{error, message}` envelopes
//! into typed results. One request per call; no retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::types::{
    DetailResponse, LocationMode, LoginResponse, LoginResult, PhotoPart, RegisterResponse, Story,
    StoryResponse, UploadResponse,
};

/// Default service endpoint.
const DEFAULT_BASE_URL: &str = "https://story-api.dicoding.dev/v1";

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// The remote surface the rest of the core talks to.
///
/// `stories` is the Remote Source of the paging pipeline: `page` is 1-based,
/// an empty result signals the end of the data set. The remaining methods
/// cover account and story management.
#[async_trait]
pub trait StoryApi: Send + Sync {
    /// Create an account. `POST /register`, form-encoded.
    async fn register(&self, name: &str, email: &str, password: &str)
        -> Result<RegisterResponse>;

    /// Exchange credentials for a bearer token. `POST /login`, form-encoded.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult>;

    /// Fetch one page of stories. `GET /stories?page&size&location`.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] when `page < 1`, `size == 0`, or the
    /// token is empty; transport/server failures as usual.
    async fn stories(
        &self,
        token: &str,
        page: u32,
        size: u32,
        location: LocationMode,
    ) -> Result<Vec<Story>>;

    /// Fetch a single story. `GET /stories/{id}`.
    async fn story_detail(&self, token: &str, id: &str) -> Result<Story>;

    /// Upload a new story. `POST /stories`, multipart/form-data.
    async fn upload_story(
        &self,
        token: &str,
        photo: PhotoPart,
        description: &str,
        coordinates: Option<(f64, f64)>,
    ) -> Result<UploadResponse>;

    /// Fetch all geo-tagged stories. `GET /stories?location=1`.
    async fn stories_with_location(&self, token: &str) -> Result<Vec<Story>>;
}

#[derive(Serialize)]
struct RegisterForm<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginForm<'a> {
    email: &'a str,
    password: &'a str,
}

/// Minimal envelope used to pull a message out of an error body.
#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation of [`StoryApi`].
pub struct StoryApiClient {
    http_client: Arc<dyn HttpClient>,
    config: ApiConfig,
}

impl StoryApiClient {
    /// Create a client over the given transport and configuration.
    pub fn new(http_client: Arc<dyn HttpClient>, config: ApiConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn require_token(token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(ApiError::InvalidRequest {
                field: "token".to_string(),
                message: "Bearer token must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Decode a response, folding the `{error, message}` envelope and non-2xx
    /// statuses into [`ApiError::Server`].
    fn decode_envelope<T, F>(response: HttpResponse, error_flag: F) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        if !response.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(status = response.status, message = %message, "Server rejected request");
            return Err(ApiError::Server {
                status: response.status,
                message,
            });
        }

        let payload: T = response.json()?;
        if error_flag(&payload) {
            let message = response
                .json::<ErrorEnvelope>()
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ApiError::Server {
                status: response.status,
                message,
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl StoryApi for StoryApiClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse> {
        let request = HttpRequest::new(HttpMethod::Post, self.url("/register"))
            .timeout(self.config.timeout)
            .form(&RegisterForm {
                name,
                email,
                password,
            })?;

        let response = self.http_client.execute(request).await?;
        Self::decode_envelope(response, |r: &RegisterResponse| r.error)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        let request = HttpRequest::new(HttpMethod::Post, self.url("/login"))
            .timeout(self.config.timeout)
            .form(&LoginForm { email, password })?;

        let response = self.http_client.execute(request).await?;
        let status = response.status;
        let payload: LoginResponse = Self::decode_envelope(response, |r: &LoginResponse| r.error)?;

        payload.login_result.ok_or_else(|| ApiError::Server {
            status,
            message: "Login succeeded without credentials in the response".to_string(),
        })
    }

    #[instrument(skip(self, token))]
    async fn stories(
        &self,
        token: &str,
        page: u32,
        size: u32,
        location: LocationMode,
    ) -> Result<Vec<Story>> {
        Self::require_token(token)?;
        if page < 1 {
            return Err(ApiError::InvalidRequest {
                field: "page".to_string(),
                message: "Page index is 1-based".to_string(),
            });
        }
        if size == 0 {
            return Err(ApiError::InvalidRequest {
                field: "size".to_string(),
                message: "Page size must be positive".to_string(),
            });
        }

        let url = format!(
            "{}?page={}&size={}&location={}",
            self.url("/stories"),
            page,
            size,
            location.as_query()
        );
        let request = HttpRequest::new(HttpMethod::Get, url)
            .timeout(self.config.timeout)
            .bearer_token(token);

        let response = self.http_client.execute(request).await?;
        let payload: StoryResponse = Self::decode_envelope(response, |r: &StoryResponse| r.error)?;

        debug!(page = page, count = payload.list_story.len(), "Fetched story page");
        Ok(payload.list_story)
    }

    #[instrument(skip(self, token), fields(story_id = %id))]
    async fn story_detail(&self, token: &str, id: &str) -> Result<Story> {
        Self::require_token(token)?;

        let request = HttpRequest::new(HttpMethod::Get, self.url(&format!("/stories/{}", id)))
            .timeout(self.config.timeout)
            .bearer_token(token);

        let response = self.http_client.execute(request).await?;
        let status = response.status;
        let payload: DetailResponse = Self::decode_envelope(response, |r: &DetailResponse| r.error)?;

        payload.story.ok_or_else(|| ApiError::Server {
            status,
            message: "Story detail missing from response".to_string(),
        })
    }

    #[instrument(skip(self, token, photo, description))]
    async fn upload_story(
        &self,
        token: &str,
        photo: PhotoPart,
        description: &str,
        coordinates: Option<(f64, f64)>,
    ) -> Result<UploadResponse> {
        Self::require_token(token)?;

        let mut form = MultipartForm::new()
            .file("photo", photo.file_name, photo.mime_type, photo.data)
            .text("description", description);
        if let Some((lat, lon)) = coordinates {
            form = form.text("lat", lat.to_string()).text("lon", lon.to_string());
        }

        let content_type = form.content_type();
        let request = HttpRequest::new(HttpMethod::Post, self.url("/stories"))
            .timeout(self.config.timeout)
            .bearer_token(token)
            .header("Content-Type", content_type)
            .body(form.into_body());

        let response = self.http_client.execute(request).await?;
        Self::decode_envelope(response, |r: &UploadResponse| r.error)
    }

    #[instrument(skip(self, token))]
    async fn stories_with_location(&self, token: &str) -> Result<Vec<Story>> {
        Self::require_token(token)?;

        let url = format!(
            "{}?location={}",
            self.url("/stories"),
            LocationMode::Required.as_query()
        );
        let request = HttpRequest::new(HttpMethod::Get, url)
            .timeout(self.config.timeout)
            .bearer_token(token);

        let response = self.http_client.execute(request).await?;
        let payload: StoryResponse = Self::decode_envelope(response, |r: &StoryResponse| r.error)?;
        Ok(payload.list_story)
    }
}
