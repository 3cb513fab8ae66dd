use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("API error: {0}")]
    Api(#[from] core_api::ApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] core_cache::CacheError),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),

    #[error("Paging error: {0}")]
    Paging(#[from] core_paging::PagingError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
