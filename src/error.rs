//! Error types for the advisory cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Faults raised inside the cache tiers.
///
/// Public cache operations never hand these to callers (they degrade to a miss
/// or a no-op); they surface only from `CacheManager::initialize` and from the
/// tier types themselves. Variants carry messages so the type is `Clone` and a
/// single initialization outcome can be shared by every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The durable store cannot be opened or reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A request could not be canonicalized or a payload could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The durable write failed after the volatile write succeeded
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// A single durable store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Service Error Enum ==
/// Errors returned by the advisory service to its callers.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The service (or the cache beneath it) failed to initialize
    #[error("Initialization failed: {0}")]
    Initialization(#[from] CacheError),

    /// The remote advisor failed to produce a result
    #[error("Advisor error: {0}")]
    Advisor(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Initialization(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Advisor(_) => StatusCode::BAD_GATEWAY,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache internals.
pub type Result<T> = std::result::Result<T, CacheError>;
