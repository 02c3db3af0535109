use thiserror::Error;

use crate::api::ApiError;

/// Shown when neither the backend nor the transport has anything better to say
pub const LOGIN_FALLBACK_MESSAGE: &str = "Login failed. Please check your credentials.";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend accepted the login but did not hand out an access token
    #[error("Login failed: no token received from backend")]
    NoTokenReceived,

    #[error(transparent)]
    Transport(#[from] ApiError),

    #[error("Failed to persist session: {0:#}")]
    Storage(anyhow::Error),
}

impl AuthError {
    /// Message for the login screen: the server's own message first, then
    /// the transport error text, then a fixed fallback.
    ///
    /// Only network and parse failures carry transport text. A status error
    /// without a server message counts as having none, since its display
    /// form is just the status code and raw body.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Transport(e) => match e.server_message() {
                Some(message) => message.to_string(),
                None => match e {
                    ApiError::NetworkError(_) | ApiError::InvalidResponse(_) => e.to_string(),
                    _ => LOGIN_FALLBACK_MESSAGE.to_string(),
                },
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = AuthError::from(ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid email or password"}"#,
        ));
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_user_message_transport_text() {
        let err = AuthError::from(ApiError::InvalidResponse("not json".into()));
        assert_eq!(err.user_message(), "Invalid response: not json");

        assert_eq!(
            AuthError::NoTokenReceived.user_message(),
            "Login failed: no token received from backend"
        );
    }

    #[test]
    fn test_user_message_fixed_fallback() {
        let err = AuthError::from(ApiError::from_status(StatusCode::UNAUTHORIZED, ""));
        assert_eq!(err.user_message(), LOGIN_FALLBACK_MESSAGE);

        let err = AuthError::from(ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>"));
        assert_eq!(err.user_message(), LOGIN_FALLBACK_MESSAGE);
    }
}
