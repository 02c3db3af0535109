//! Core library for the CEMES admin client.
//!
//! - `auth`: session storage, login/logout and authentication state
//! - `api`: the shared request pipeline and the resource CRUD services
//! - `navigation`: routes, the route guard and the host's `Navigator` port
//! - `models`: Loan, Customer, Payment and Admin records
//! - `config`: backend URL and storage selection

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;

use std::sync::Arc;

use anyhow::Result;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, CredentialStore, Session, SessionManager};
pub use config::Config;
pub use navigation::{Location, Navigator, Route, RouteGuard};

/// Wire the store, pipeline and session manager together for a host.
pub fn connect(
    config: &Config,
    backend: Box<dyn auth::StorageBackend>,
    navigator: Arc<dyn Navigator>,
) -> Result<SessionManager> {
    let credentials = Arc::new(CredentialStore::open(backend));
    let api = ApiClient::with_timeout(
        &config.api_base_url(),
        config.request_timeout(),
        credentials,
        navigator,
    )?;
    Ok(SessionManager::new(api))
}
