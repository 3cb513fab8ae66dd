use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },
}

impl ApiError {
    /// Human-readable message suitable for surfacing to the user.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Network(msg) => msg,
            ApiError::Decode(msg) => msg,
            ApiError::Server { message, .. } => message,
            ApiError::InvalidRequest { message, .. } => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
