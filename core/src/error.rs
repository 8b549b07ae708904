//! Error types for the Genzura client core.
//!
//! # Design
//! `ApiError` keeps the failure kind while a request is in flight, but the
//! facade never hands it to callers: every public operation flattens it into
//! `ApiResponse::Error` through the `From` impl in `envelope`. The `Display`
//! text is the message the caller ends up seeing, so `Http` prints only its
//! message (`HTTP error! status: 404` when the server sent nothing usable).

use thiserror::Error;

/// Failures met while talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, IO).
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Error for a non-2xx status whose body carried no message.
    pub fn status(status: u16) -> Self {
        ApiError::Http {
            status,
            message: format!("HTTP error! status: {status}"),
        }
    }
}

/// Failures of a `SessionStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store format: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_status_message_matches_wire_contract() {
        assert_eq!(ApiError::status(404).to_string(), "HTTP error! status: 404");
    }

    #[test]
    fn http_error_displays_server_message_only() {
        let err = ApiError::Http {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}
