/**
 * Error Conversion
 *
 * Conversions into [`BackendError`] from library errors, and from
 * [`BackendError`] into an HTTP response.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    /// Convert a backend error into an HTTP response
    ///
    /// The response is a JSON object with:
    /// - `error`: The error message
    /// - `status`: The HTTP status code
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        Self::store(err.to_string())
    }
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        Self::bus(err.to_string())
    }
}

impl From<axum::Error> for BackendError {
    fn from(err: axum::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err.to_string())
    }
}
