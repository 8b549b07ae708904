//! Envelope responses: `{status: "success", data?, message?}` or
//! `{status: "error", error}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope<T> {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<T>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        error: String,
    },
}

pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let body = Envelope::Success {
        data: Some(data),
        message: None,
    };
    (status, Json(body)).into_response()
}

pub fn message(text: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope::Success {
        data: None,
        message: Some(text.into()),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// A failed request, rendered as an error envelope.
#[derive(Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        let body: Envelope<()> = Envelope::Error {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult = Result<Response, Failure>;
