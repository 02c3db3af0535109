use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::navigation::{Location, NavigationMode};

use super::credentials::CredentialStore;
use super::error::AuthError;
use super::session::{AuthState, Session, UserProfile};

const LOGIN_PATH: &str = "/api/Admin/login";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Owns login and logout.
///
/// Authentication is read from the credential store's current session every
/// time, so a 401 handled by the request pipeline shows up here without any
/// extra wiring.
pub struct SessionManager {
    api: ApiClient,
    session: watch::Receiver<Session>,
}

impl SessionManager {
    /// Build on top of the pipeline; the starting state is whatever the
    /// store loaded, with no network call.
    pub fn new(api: ApiClient) -> Self {
        let session = api.credentials().subscribe();
        debug!(
            authenticated = session.borrow().is_authenticated(),
            "Session manager initialized"
        );
        Self { api, session }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn credentials(&self) -> &Arc<CredentialStore> {
        self.api.credentials()
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.session.borrow().state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session.borrow().user.clone()
    }

    /// Watch for session changes (login, logout, expiry)
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// Authenticate against the backend and persist the new session.
    ///
    /// The stored session is only replaced once a usable token is in hand.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        info!(email, "Logging in");
        let body = LoginRequest { email, password };

        // Goes through the shared pipeline, so a 401 also ends any existing session
        let text = self
            .api
            .send(Method::POST, LOGIN_PATH, Some(&body))
            .await
            .map_err(|e| {
                warn!(error = %e, "Login failed");
                AuthError::from(e)
            })?;

        let session = parse_login_response(&text)?;
        self.credentials()
            .save(&session)
            .map_err(AuthError::Storage)?;

        info!(
            user = ?session.user.as_ref().map(|u| u.display_name()),
            "Login successful"
        );
        Ok(session)
    }

    /// End the session and return to the login view. Safe to call repeatedly.
    pub fn logout(&self) {
        if let Err(e) = self.credentials().clear() {
            warn!(error = %e, "Failed to clear stored session on logout");
        }
        info!("Logged out");
        self.api
            .navigator()
            .navigate(&Location::login(), NavigationMode::Push);
    }
}

fn parse_login_response(text: &str) -> Result<Session, AuthError> {
    let data: Value = serde_json::from_str(text).unwrap_or_else(|e| {
        debug!(error = %e, "Login response is not JSON");
        Value::Null
    });

    let string_field = |name: &str| {
        data.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let access_token = string_field("accessToken").ok_or_else(|| {
        warn!("Login response did not include an access token");
        AuthError::NoTokenReceived
    })?;

    let user = match data.get("user") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<UserProfile>(raw.clone()) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed user profile in login response");
                None
            }
        },
    };

    Ok(Session::new(
        Some(access_token),
        string_field("refreshToken"),
        user,
    ))
}
