//! # Remote API Module
//!
//! Thin networking layer for the story service REST API.
//!
//! ## Overview
//!
//! This crate covers:
//! - An async [`HttpClient`] abstraction with a reqwest-backed implementation
//! - Form-urlencoded and multipart/form-data request encoding
//! - Wire DTOs for the `/register`, `/login`, `/stories` endpoint family
//! - The [`StoryApi`] trait and its HTTP implementation ([`StoryApiClient`])
//!
//! Authenticated calls carry an opaque bearer token in the `Authorization`
//! header. All transport, decode, and server-side failures collapse into
//! [`ApiError`]; retry policy belongs to callers (currently: none, a single
//! attempt per request).

pub mod client;
pub mod error;
pub mod http;
pub mod multipart;
pub mod types;

pub use client::{ApiConfig, StoryApi, StoryApiClient};
pub use error::{ApiError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use types::{
    DetailResponse, LocationMode, LoginResponse, LoginResult, PhotoPart, RegisterResponse, Story,
    StoryResponse, UploadResponse,
};
