use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Common response envelope used by every control-plane endpoint:
/// `{success, message, code, data, timestamp}`.
#[derive(Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub code: u16,
    pub data: Value,
    pub timestamp: String,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// 200 OK with a data payload.
pub fn ok(data: Value) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: "ok".to_string(),
            code: 200,
            data,
            timestamp: now(),
        }),
    )
        .into_response()
}

/// 200 OK with an explicit message and data payload.
pub fn ok_with(message: impl Into<String>, data: Value) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: message.into(),
            code: 200,
            data,
            timestamp: now(),
        }),
    )
        .into_response()
}

/// Validation/application error — never panics the handler, always returns
/// `{success:false, message, code}` with a matching HTTP status.
pub fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(Envelope {
            success: false,
            message: message.into(),
            code: status.as_u16(),
            data: Value::Null,
            timestamp: now(),
        }),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    fail(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    fail(StatusCode::NOT_FOUND, message)
}

pub fn forbidden(message: impl Into<String>) -> Response {
    fail(StatusCode::FORBIDDEN, message)
}

pub fn internal(message: impl Into<String>) -> Response {
    fail(StatusCode::INTERNAL_SERVER_ERROR, message)
}
