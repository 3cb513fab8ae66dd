use core_api::ApiError;
use core_cache::CacheError;
use core_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagingError {
    #[error("Remote error: {0}")]
    Remote(#[from] ApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Load cancelled")]
    Cancelled,
}

impl PagingError {
    /// Human-readable message suitable for surfacing to the user.
    pub fn user_message(&self) -> String {
        match self {
            PagingError::Remote(e) => e.user_message().to_string(),
            PagingError::Cache(e) => e.to_string(),
            PagingError::Session(e) => e.to_string(),
            PagingError::Cancelled => "Load cancelled".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PagingError>;
