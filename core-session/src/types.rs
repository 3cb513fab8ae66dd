use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated session.
///
/// Created on successful login, persisted until explicit logout, read on
/// every authenticated request.
///
/// # Security
///
/// The token is an opaque bearer credential; the `Debug` implementation
/// redacts it so sessions can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token authorizing API requests.
    pub token: String,
    /// Whether this session represents a signed-in user.
    pub is_login: bool,
    /// Email of the signed-in account.
    pub email: String,
}

impl Session {
    /// Create a signed-in session.
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            is_login: true,
            email: email.into(),
        }
    }

    /// Whether the session can authorize requests.
    pub fn is_authenticated(&self) -> bool {
        self.is_login && !self.token.is_empty()
    }
}

// Custom Debug implementation to avoid logging the token
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("is_login", &self.is_login)
            .field("email", &self.email)
            .finish()
    }
}
