use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message shown to users when a request never produced an upstream answer
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

#[derive(Error, Debug)]
pub enum Error {
    /// Upstream answered 404
    #[error("{0}")]
    NotFound(String),

    /// Upstream answered non-2xx; carries the upstream message verbatim
    #[error("{0}")]
    Upstream(String),

    /// Network failure or an unreadable upstream body
    #[error("Transport failure: {0}")]
    Transport(String),

    /// AI flow input or output did not match its schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The message presented to the user for this error.
    ///
    /// Repository API failures keep their upstream wording; transport
    /// failures collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(msg) | Error::Upstream(msg) | Error::Validation(msg) => msg.clone(),
            Error::Transport(_) => UNEXPECTED_ERROR.to_string(),
            Error::SchemaViolation(_) | Error::Config(_) | Error::Internal(_) => {
                "An error occurred. Please try again.".to_string()
            }
        }
    }

    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            Error::Transport(msg) | Error::Internal(msg) | Error::Config(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("token") || lower.contains("key") || lower.contains("secret") {
                    "Error details redacted".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) | Error::Transport(_) | Error::SchemaViolation(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("Request error: {}", self.log_safe());

        let body = Json(json!({
            "error": self.user_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_keeps_upstream_wording() {
        let err = Error::Upstream("Bad credentials".to_string());
        assert_eq!(err.user_message(), "Bad credentials");

        let err = Error::NotFound("User not found.".to_string());
        assert_eq!(err.user_message(), "User not found.");
    }

    #[test]
    fn test_transport_failure_is_generic() {
        let err = Error::Transport("connection refused".to_string());
        assert_eq!(err.user_message(), UNEXPECTED_ERROR);
    }

    #[test]
    fn test_log_safe_redacts_keys() {
        let err = Error::Config("AI_API_KEY rejected: abc123".to_string());
        assert_eq!(err.log_safe(), "Error details redacted");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Validation("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Upstream("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
