//! Error types for the order cache and its HTTP surface
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
/// Errors raised by the cache itself.
///
/// Runtime operations (`set`, `get`, `load_from_slice`) never fail; only
/// construction and lifecycle transitions can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction parameters were rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `close` was called on a cache that is already closed
    #[error("Cache already closed")]
    AlreadyClosed,
}

// == Snapshot Error Enum ==
/// Errors raised while reading the startup snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot file could not be read
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not a JSON array of orders
    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

// == API Error Enum ==
/// Errors returned by the HTTP query surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No order id was supplied
    #[error("order id is required")]
    MissingId,

    /// Order id contains characters outside `[0-9A-Za-z-]`
    #[error("invalid order id format: {0}")]
    InvalidId(String),

    /// Order is not cached (never seen, evicted or expired)
    #[error("order not found: {0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingId => StatusCode::BAD_REQUEST,
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
