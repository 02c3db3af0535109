use tracing::debug;

use crate::auth::{AuthError, Session, SessionManager};

use super::route::{Location, Route};
use super::{NavigationMode, Navigator};

/// Redirect chains longer than this are a routing bug
const MAX_REDIRECTS: usize = 4;

/// Where an anonymous user was headed before being sent to login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDestination(Location);

impl PendingDestination {
    pub fn new(location: Location) -> Self {
        Self(location)
    }

    pub fn location(&self) -> &Location {
        &self.0
    }

    /// Where to go once logged in: the pending location, or the landing view
    pub fn resume_target(pending: Option<&PendingDestination>) -> Location {
        pending
            .map(|p| p.0.clone())
            .unwrap_or_else(Location::landing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render(Route),
    Redirect {
        to: Location,
        pending: Option<PendingDestination>,
    },
}

/// Gate in front of the protected views.
///
/// Holds no state: every navigation is checked against the session as it is
/// at that moment.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteGuard;

impl RouteGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, requested: &Location, authenticated: bool) -> GuardDecision {
        match requested.route() {
            None => GuardDecision::Redirect {
                to: Location::landing(),
                pending: None,
            },
            Some(route) if route.is_protected() && !authenticated => GuardDecision::Redirect {
                to: Location::login(),
                pending: Some(PendingDestination::new(requested.clone())),
            },
            Some(route) => GuardDecision::Render(route),
        }
    }

    /// Check against a session snapshot rather than a bare flag
    pub fn check_session(&self, requested: &Location, session: &Session) -> GuardDecision {
        self.check(requested, session.is_authenticated())
    }

    /// Navigate to `requested`, following guard redirects.
    ///
    /// Each redirect is handed to the navigator as a replace. Returns the
    /// route that ends up rendered and the destination to resume after login.
    pub fn resolve(
        &self,
        requested: &Location,
        manager: &SessionManager,
        navigator: &dyn Navigator,
    ) -> (Route, Option<PendingDestination>) {
        let mut current = requested.clone();
        let mut pending = None;

        for _ in 0..MAX_REDIRECTS {
            match self.check_session(&current, &manager.session()) {
                GuardDecision::Render(route) => return (route, pending),
                GuardDecision::Redirect { to, pending: from } => {
                    debug!(from = %current, to = %to, "Guard redirect");
                    if from.is_some() {
                        pending = from;
                    }
                    navigator.navigate(&to, NavigationMode::Replace);
                    current = to;
                }
            }
        }

        // Landing and login always resolve, so this is only reachable if the route table is broken
        (Route::Login, pending)
    }
}

/// One login attempt from the login view.
#[derive(Debug, Clone, Default)]
pub struct LoginFlow {
    pending: Option<PendingDestination>,
}

impl LoginFlow {
    pub fn new(pending: Option<PendingDestination>) -> Self {
        Self { pending }
    }

    pub fn pending(&self) -> Option<&PendingDestination> {
        self.pending.as_ref()
    }

    /// Log in, then continue to the pending destination (or the landing
    /// view). On failure the flow is handed back so the form can retry; only
    /// a 401 from the backend navigates, through the pipeline's reload.
    pub async fn submit(
        self,
        manager: &SessionManager,
        email: &str,
        password: &str,
    ) -> Result<Location, (AuthError, LoginFlow)> {
        if let Err(e) = manager.login(email, password).await {
            return Err((e, self));
        }
        let target = PendingDestination::resume_target(self.pending.as_ref());
        manager
            .api()
            .navigator()
            .navigate(&target, NavigationMode::Replace);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiClient;
    use crate::auth::{CredentialStore, MemoryStorage};
    use crate::navigation::testing::RecordingNavigator;

    fn manager(uri: &str, token: Option<&str>) -> (SessionManager, Arc<RecordingNavigator>) {
        let store = Arc::new(CredentialStore::open(Box::new(MemoryStorage::new())));
        if let Some(token) = token {
            store
                .save(&Session::new(Some(token.into()), None, None))
                .unwrap();
        }
        let navigator = Arc::new(RecordingNavigator::default());
        let api = ApiClient::new(uri, store, navigator.clone()).unwrap();
        (SessionManager::new(api), navigator)
    }

    #[test]
    fn test_anonymous_protected_redirects_with_pending() {
        let guard = RouteGuard::new();
        let requested = Location::new("/loans?status=Active");

        let decision = guard.check(&requested, false);

        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: Location::login(),
                pending: Some(PendingDestination::new(requested)),
            }
        );
    }

    #[test]
    fn test_authenticated_renders() {
        let guard = RouteGuard::new();
        assert_eq!(
            guard.check(&Location::new("/payments"), true),
            GuardDecision::Render(Route::Payments)
        );
        assert_eq!(
            guard.check(&Location::new("/"), true),
            GuardDecision::Render(Route::Dashboard)
        );
    }

    #[test]
    fn test_login_is_always_reachable() {
        let guard = RouteGuard::new();
        assert_eq!(guard.check(&Location::login(), false), GuardDecision::Render(Route::Login));
        assert_eq!(guard.check(&Location::login(), true), GuardDecision::Render(Route::Login));
    }

    #[test]
    fn test_unknown_path_goes_to_landing() {
        let guard = RouteGuard::new();
        assert_eq!(
            guard.check(&Location::new("/reports"), true),
            GuardDecision::Redirect {
                to: Location::landing(),
                pending: None,
            }
        );
    }

    #[test]
    fn test_check_session_uses_token_presence() {
        let guard = RouteGuard::new();
        let admin = Location::new("/admin");

        assert!(matches!(
            guard.check_session(&admin, &Session::empty()),
            GuardDecision::Redirect { .. }
        ));
        let session = Session::new(Some("tok".into()), None, None);
        assert_eq!(
            guard.check_session(&admin, &session),
            GuardDecision::Render(Route::Admin)
        );
    }

    #[test]
    fn test_resume_target_defaults_to_landing() {
        assert_eq!(PendingDestination::resume_target(None), Location::landing());
        let pending = PendingDestination::new(Location::new("/admin"));
        assert_eq!(
            PendingDestination::resume_target(Some(&pending)),
            Location::new("/admin")
        );
    }

    #[test]
    fn test_resolve_anonymous_unknown_path_records_landing() {
        let (manager, navigator) = manager("http://127.0.0.1:9", None);
        let guard = RouteGuard::new();

        let (route, pending) = guard.resolve(&Location::new("/nope"), &manager, navigator.as_ref());

        assert_eq!(route, Route::Login);
        assert_eq!(pending, Some(PendingDestination::new(Location::landing())));
        assert_eq!(
            navigator.visits(),
            vec![
                (Location::landing(), NavigationMode::Replace),
                (Location::login(), NavigationMode::Replace),
            ]
        );
    }

    #[test]
    fn test_guard_rechecks_after_logout() {
        let (manager, navigator) = manager("http://127.0.0.1:9", Some("tok"));
        let guard = RouteGuard::new();
        let customers = Location::new("/customers");

        let (route, _) = guard.resolve(&customers, &manager, navigator.as_ref());
        assert_eq!(route, Route::Customers);

        manager.logout();

        let (route, pending) = guard.resolve(&customers, &manager, navigator.as_ref());
        assert_eq!(route, Route::Login);
        assert_eq!(pending, Some(PendingDestination::new(customers)));
    }

    #[tokio::test]
    async fn test_login_resumes_pending_destination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Admin/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "t"})))
            .mount(&server)
            .await;

        let (manager, navigator) = manager(&server.uri(), None);
        let guard = RouteGuard::new();
        let (route, pending) = guard.resolve(&Location::new("/payments"), &manager, navigator.as_ref());
        assert_eq!(route, Route::Login);

        let target = LoginFlow::new(pending)
            .submit(&manager, "a@b.c", "pw")
            .await
            .unwrap();

        assert_eq!(target, Location::new("/payments"));
        assert_eq!(
            navigator.last(),
            Some((Location::new("/payments"), NavigationMode::Replace))
        );
        assert_eq!(
            guard.check(&target, manager.is_authenticated()),
            GuardDecision::Render(Route::Payments)
        );
    }

    #[tokio::test]
    async fn test_login_without_pending_goes_to_landing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Admin/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "t"})))
            .mount(&server)
            .await;

        let (manager, navigator) = manager(&server.uri(), None);
        let target = LoginFlow::default()
            .submit(&manager, "a@b.c", "pw")
            .await
            .unwrap();

        assert_eq!(target, Location::landing());
        assert_eq!(navigator.last(), Some((Location::landing(), NavigationMode::Replace)));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_pending_for_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Admin/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (manager, navigator) = manager(&server.uri(), None);
        let pending = PendingDestination::new(Location::new("/admin"));

        let (err, flow) = LoginFlow::new(Some(pending.clone()))
            .submit(&manager, "a@b.c", "pw")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::NoTokenReceived));
        assert_eq!(flow.pending(), Some(&pending));
        assert!(navigator.visits().is_empty());
    }
}
