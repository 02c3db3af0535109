use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload as far as the backend describes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody {
    /// `message` field of a JSON error body, if there was one
    pub message: Option<String>,
    /// Raw body, truncated
    pub raw: String,
}

#[derive(Deserialize)]
struct MessageField {
    message: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Self {
        let message = serde_json::from_str::<MessageField>(body)
            .ok()
            .and_then(|m| m.message)
            .filter(|m| !m.trim().is_empty());
        Self {
            message,
            raw: truncate_body(body),
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.raw.is_empty()) {
            (Some(message), _) => f.write_str(message),
            (None, false) => f.write_str(&self.raw),
            (None, true) => f.write_str("no details"),
        }
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session expired or credentials rejected: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Bad request: {0}")]
    BadRequest(ErrorBody),

    #[error("Conflict: {0}")]
    Conflict(ErrorBody),

    #[error("Server error: {0}")]
    ServerError(ErrorBody),

    #[error("Status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: ErrorBody,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = ErrorBody::parse(body);
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(body),
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            409 => ApiError::Conflict(body),
            500..=599 => ApiError::ServerError(body),
            _ => ApiError::UnexpectedStatus { status, body },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// The backend's own `message` for this failure, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::BadRequest(body)
            | ApiError::Conflict(body)
            | ApiError::ServerError(body)
            | ApiError::UnexpectedStatus { body, .. } => body.message.as_deref(),
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_) => None,
        }
    }
}
