//! The uniform response envelope returned by every facade call.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `{status: "success", data?, message?}` or `{status: "error", error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<T>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success {
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success { data, .. } => data.as_ref(),
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResponse::Success { data, .. } => data,
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiResponse::Success { message, .. } => message.as_deref(),
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ApiResponse::Success { .. } => None,
            ApiResponse::Error { error } => Some(error),
        }
    }
}

impl<T> From<ApiError> for ApiResponse<T> {
    fn from(err: ApiError) -> Self {
        ApiResponse::error(err.to_string())
    }
}
