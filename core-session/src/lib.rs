//! # Session Module
//!
//! Owns the authenticated session: the opaque bearer token handed out by
//! the story service at login, plus the signed-in account's email.
//!
//! ## Overview
//!
//! - [`Session`]: the persisted credential value type
//! - [`PreferenceStore`]: small key/value persistence seam with a
//!   file-backed implementation ([`FilePreferenceStore`])
//! - [`SessionStore`]: JSON (de)serialization of the session on top of a
//!   preference store
//! - [`SessionManager`]: drives login/signup/logout against the remote API
//!   and keeps the in-memory session in sync with the persisted one
//!
//! The token is created on successful login, persisted until explicit
//! logout, and read on every authenticated request. Clearing it does not
//! retroactively revoke requests already in flight; there is no revocation
//! channel.

pub mod error;
pub mod file_store;
pub mod manager;
pub mod store;
pub mod types;

pub use error::{Result, SessionError};
pub use file_store::FilePreferenceStore;
pub use manager::SessionManager;
pub use store::{PreferenceStore, SessionStore};
pub use types::Session;
