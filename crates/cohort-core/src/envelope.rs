//! JSON response envelope.
//!
//! Every endpoint answers with either `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": { "code": <number>, "message": <string> } }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Successful response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `ApiResponse` with an explicit status, e.g. `201 Created`.
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(ApiResponse::ok(self.0))).into_response()
    }
}

/// Plain acknowledgement payload: `{ "message": "..." }`.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    code: u16,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorPayload<'a>,
}

/// Render a failure envelope with the given HTTP status and numeric error code.
pub fn error_response(status: StatusCode, code: u16, message: &str) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: ErrorPayload { code, message },
    };
    (status, Json(body)).into_response()
}
