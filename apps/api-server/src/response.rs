//! JSON error bodies and `CoreError` to HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::CoreError;
use tracing::error;

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "invalid_request" => "Bad request",
        "invalid_id" => "Invalid id",
        "conflict" => "Resource already exists",
        "internal" => "Internal server error",
        _ => code,
    };
    json_error_with_message(code, message)
}

/// Create a structured error JSON with a custom message.
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

pub fn core_error_response(e: CoreError) -> Response {
    match e {
        CoreError::NotFound | CoreError::InvalidCollection(_) => {
            (StatusCode::NOT_FOUND, Json(json_err("not_found"))).into_response()
        }
        CoreError::InvalidRecord(msg) => (
            StatusCode::BAD_REQUEST,
            Json(json_error_with_message("invalid_request", &msg)),
        )
            .into_response(),
        CoreError::InvalidId => {
            (StatusCode::BAD_REQUEST, Json(json_err("invalid_id"))).into_response()
        }
        CoreError::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(json_error_with_message("conflict", "duplicate id")),
        )
            .into_response(),
        CoreError::Repository(msg) => {
            error!(err = %msg, "repository error");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json_err("internal"))).into_response()
        }
    }
}
