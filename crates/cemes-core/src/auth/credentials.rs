use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::session::{non_empty, Session, UserProfile};
use super::storage::StorageBackend;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Persists the session and publishes the current value to observers.
///
/// Writes go through one lock so a reader of the snapshot never sees a
/// session that is half old and half new.
pub struct CredentialStore {
    backend: Mutex<Box<dyn StorageBackend>>,
    current: watch::Sender<Session>,
}

impl CredentialStore {
    /// Open the store and load whatever session the backend already holds
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        let initial = Self::read_session(backend.as_ref());
        debug!(
            authenticated = initial.is_authenticated(),
            has_user = initial.user.is_some(),
            "Credential store opened"
        );
        let (current, _) = watch::channel(initial);
        Self {
            backend: Mutex::new(backend),
            current,
        }
    }

    /// Read the persisted session from the backend.
    ///
    /// A profile that no longer parses is dropped with a warning; the next
    /// login or logout overwrites it.
    pub fn load(&self) -> Session {
        let backend = self.lock_backend();
        Self::read_session(backend.as_ref())
    }

    /// Replace the persisted session with `session`.
    ///
    /// All or nothing: if any key fails to write, the previous values are
    /// put back, and if that fails too every key is removed. The backend
    /// never keeps a mix of the old and new session.
    pub fn save(&self, session: &Session) -> Result<()> {
        let user = session
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize user profile")?;
        let entries = [
            (ACCESS_TOKEN_KEY, session.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, session.refresh_token.as_deref()),
            (USER_KEY, user.as_deref()),
        ];

        let backend = self.lock_backend();
        let previous = CREDENTIAL_KEYS.map(|key| (key, backend.get(key)));

        for (key, value) in entries {
            if let Err(e) = Self::write_key(backend.as_ref(), key, value) {
                warn!(key, error = %e, "Failed to save session, rolling back");
                if !Self::restore(backend.as_ref(), &previous) {
                    Self::remove_all(backend.as_ref());
                    self.current.send_replace(Session::empty());
                }
                return Err(e);
            }
        }

        self.current.send_replace(session.clone());
        debug!(has_refresh = session.refresh_token.is_some(), "Session saved");
        Ok(())
    }

    /// Remove all three keys.
    ///
    /// The in-memory session is cleared even when the backend fails, so the
    /// process stops using the token either way.
    pub fn clear(&self) -> Result<()> {
        let backend = self.lock_backend();
        self.current.send_replace(Session::empty());

        let first_error = Self::remove_all(backend.as_ref());
        debug!("Session cleared");

        match first_error {
            Some(e) => Err(e.context("Failed to clear stored session")),
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.current.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.borrow().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_authenticated()
    }

    /// Watch session changes, including clears triggered by expired tokens
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.current.subscribe()
    }

    fn lock_backend(&self) -> std::sync::MutexGuard<'_, Box<dyn StorageBackend>> {
        self.backend.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_key(backend: &dyn StorageBackend, key: &str, value: Option<&str>) -> Result<()> {
        let result = match value {
            Some(value) => backend.set(key, value),
            None => backend.remove(key),
        };
        result.with_context(|| format!("Failed to persist {}", key))
    }

    /// Put back the values read before a failed save. Returns false if any
    /// key could not be restored.
    fn restore(
        backend: &dyn StorageBackend,
        previous: &[(&'static str, Result<Option<String>>)],
    ) -> bool {
        let mut restored = true;
        for (key, value) in previous {
            let result = match value {
                Ok(value) => Self::write_key(backend, key, value.as_deref()),
                Err(_) => Err(anyhow::anyhow!("previous value was unreadable")),
            };
            if let Err(e) = result {
                warn!(key, error = %e, "Failed to restore stored credential");
                restored = false;
            }
        }
        restored
    }

    /// Remove every key, returning the first failure
    fn remove_all(backend: &dyn StorageBackend) -> Option<anyhow::Error> {
        let mut first_error = None;
        for key in CREDENTIAL_KEYS {
            if let Err(e) = backend.remove(key) {
                warn!(key, error = %e, "Failed to remove stored credential");
                first_error.get_or_insert(e);
            }
        }
        first_error
    }

    fn read_key(backend: &dyn StorageBackend, key: &str) -> Option<String> {
        match backend.get(key) {
            Ok(value) => non_empty(value),
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored credential, treating as absent");
                None
            }
        }
    }

    fn read_session(backend: &dyn StorageBackend) -> Session {
        let user = Self::read_key(backend, USER_KEY).and_then(|raw| {
            match serde_json::from_str::<Option<UserProfile>>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Stored user profile is corrupt, ignoring until next login");
                    None
                }
            }
        });

        Session::new(
            Self::read_key(backend, ACCESS_TOKEN_KEY),
            Self::read_key(backend, REFRESH_TOKEN_KEY),
            user,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::auth::storage::{FileStorage, MemoryStorage};

    /// Backend that shares its map with the test so stored values can be inspected
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl StorageBackend for SharedStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key)
        }
    }

    struct FailingStorage;

    impl StorageBackend for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("backend offline"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow::anyhow!("backend offline"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("backend offline"))
        }
    }

    /// Fails `set` on one key a limited number of times
    struct FlakyStorage {
        inner: SharedStorage,
        fail_key: &'static str,
        failures_left: AtomicUsize,
    }

    impl FlakyStorage {
        fn new(inner: SharedStorage, fail_key: &'static str, failures: usize) -> Self {
            Self {
                inner,
                fail_key,
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    impl StorageBackend for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.fail_key
                && self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(anyhow::anyhow!("disk full"));
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn old_session() -> Session {
        Session::new(
            Some("OLD".into()),
            Some("old-refresh".into()),
            Some(UserProfile {
                name: Some("Old User".into()),
                ..Default::default()
            }),
        )
    }

    fn full_session() -> Session {
        Session::new(
            Some("access-1".into()),
            Some("refresh-1".into()),
            Some(UserProfile {
                name: Some("Grace".into()),
                email: Some("grace@cemes.org".into()),
                role: Some("SuperAdmin".into()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_open_empty_backend_is_anonymous() {
        let store = CredentialStore::open(Box::new(MemoryStorage::new()));
        assert!(store.snapshot().is_empty());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_save_then_load() {
        let storage = SharedStorage::default();
        let store = CredentialStore::open(Box::new(storage.clone()));
        let session = full_session();

        store.save(&session).unwrap();

        assert_eq!(store.load(), session);
        assert_eq!(store.snapshot(), session);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("access-1"));
    }

    #[test]
    fn test_save_removes_absent_fields() {
        let storage = SharedStorage::default();
        let store = CredentialStore::open(Box::new(storage.clone()));
        store.save(&full_session()).unwrap();

        let token_only = Session::new(Some("access-2".into()), None, None);
        store.save(&token_only).unwrap();

        assert_eq!(store.load(), token_only);
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let storage = SharedStorage::default();
        let store = CredentialStore::open(Box::new(storage.clone()));
        store.save(&full_session()).unwrap();

        store.clear().unwrap();

        assert!(store.snapshot().is_empty());
        assert!(store.load().is_empty());
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            assert_eq!(storage.get(key).unwrap(), None);
        }
    }

    #[test]
    fn test_corrupt_user_profile_loads_as_absent() {
        let storage = SharedStorage::default();
        storage.set(ACCESS_TOKEN_KEY, "access-1").unwrap();
        storage.set(USER_KEY, "{not valid json").unwrap();

        let store = CredentialStore::open(Box::new(storage));
        let session = store.snapshot();

        assert_eq!(session.token(), Some("access-1"));
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_null_user_profile_loads_as_absent() {
        let storage = SharedStorage::default();
        storage.set(USER_KEY, "null").unwrap();

        let store = CredentialStore::open(Box::new(storage));
        assert_eq!(store.snapshot().user, None);
    }

    #[test]
    fn test_reopen_from_disk_resumes_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = full_session();
        CredentialStore::open(Box::new(FileStorage::new(dir.path())))
            .save(&session)
            .unwrap();

        let reopened = CredentialStore::open(Box::new(FileStorage::new(dir.path())));
        assert_eq!(reopened.snapshot(), session);
    }

    #[test]
    fn test_failing_backend_still_clears_memory() {
        let store = CredentialStore::open(Box::new(FailingStorage));
        assert!(store.snapshot().is_empty());

        assert!(store.save(&full_session()).is_err());
        assert!(!store.is_authenticated());

        assert!(store.clear().is_err());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = CredentialStore::open(Box::new(MemoryStorage::new()));
        let mut rx = store.subscribe();

        store.save(&full_session()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        store.clear().unwrap();
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn test_failed_save_restores_previous_session() {
        let storage = SharedStorage::default();
        CredentialStore::open(Box::new(storage.clone()))
            .save(&old_session())
            .unwrap();

        let store = CredentialStore::open(Box::new(FlakyStorage::new(storage.clone(), REFRESH_TOKEN_KEY, 1)));
        assert!(store.save(&full_session()).is_err());

        assert_eq!(store.snapshot(), old_session());
        let reopened = CredentialStore::open(Box::new(storage));
        assert_eq!(reopened.snapshot(), old_session());
    }

    #[test]
    fn test_failed_save_and_restore_clears_everything() {
        let storage = SharedStorage::default();
        CredentialStore::open(Box::new(storage.clone()))
            .save(&old_session())
            .unwrap();

        let store = CredentialStore::open(Box::new(FlakyStorage::new(
            storage.clone(),
            REFRESH_TOKEN_KEY,
            usize::MAX,
        )));
        assert!(store.save(&full_session()).is_err());

        assert!(store.snapshot().is_empty());
        let reopened = CredentialStore::open(Box::new(storage.clone()));
        assert!(reopened.snapshot().is_empty());
        for key in CREDENTIAL_KEYS {
            assert_eq!(storage.get(key).unwrap(), None);
        }
    }
}
