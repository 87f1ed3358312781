//! Web error handling.
//!
//! Every handler terminates in a rendered page, a redirect, or one of
//! these; nothing else escapes to the transport.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum WebError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        tracing::error!(error = %err, "template render error");
        WebError::Internal(format!("template error: {}", err))
    }
}
