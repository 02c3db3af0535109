//! Authentication module for the admin session.
//!
//! This module provides:
//! - `Session`: access token, refresh token and user profile for one login
//! - `CredentialStore`: persists the session through a `StorageBackend`
//!   (JSON file, OS keychain or memory) and publishes changes
//! - `SessionManager`: login/logout and the derived authentication state
//!
//! There is no refresh flow: a 401 from the backend ends the session.

pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use error::{AuthError, LOGIN_FALLBACK_MESSAGE};
pub use manager::SessionManager;
pub use session::{AuthState, Session, UserProfile};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, StorageBackend};
