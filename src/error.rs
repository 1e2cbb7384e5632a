//! Error types for the entity cache
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
/// Unified error type for cache operations.
///
/// A type-tag mismatch or a key of the wrong store type is never an error:
/// reads report those as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Could not establish or discover the connection to the cache server
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// A command failed on the cache server or in transit
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A present field value could not be parsed into its declared shape
    #[error("Failed to decode field '{field}': {message}")]
    Decode { field: String, message: String },

    /// Whole-object (blob) or structured field serialization failed
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// Argument rejected before any command was issued
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection handle was disposed
    #[error("Cache connection has been disposed")]
    Disposed,

    /// Entity was not found in the cache nor in the authoritative source
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Builds a decode error for the named field.
    pub fn decode(field: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::Decode {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::Connection(_) | CacheError::Disposed => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Backend(_) => StatusCode::BAD_GATEWAY,
            CacheError::Decode { .. } | CacheError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_message() {
        let err = CacheError::decode("Id", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Failed to decode field 'Id': invalid digit found in string"
        );
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<Vec<i32>>("[1,").unwrap_err();
        let err: CacheError = parse.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_status_mapping() {
        let response = CacheError::NotFound("person 7".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = CacheError::InvalidArgument("empty key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = CacheError::Disposed.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
