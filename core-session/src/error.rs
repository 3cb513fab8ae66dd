use core_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Preference storage unavailable: {0}")]
    Store(String),

    #[error("Session data corrupted: {0}")]
    Corrupted(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, SessionError>;
