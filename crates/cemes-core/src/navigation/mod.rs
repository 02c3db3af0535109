//! Navigation surface shared by the request pipeline and the route guard.
//!
//! The core never switches views itself. The host supplies a `Navigator`
//! at startup and the core asks it to move:
//! - `Push` / `Replace`: in-app transitions (logout, guard redirects, resume after login)
//! - `Reload`: a hard redirect, used when the backend reports an expired session

pub mod guard;
pub mod route;

pub use guard::{GuardDecision, LoginFlow, PendingDestination, RouteGuard};
pub use route::{Location, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    Push,
    Replace,
    Reload,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &Location, mode: NavigationMode);
}

/// Navigator for hosts without a view layer
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _to: &Location, _mode: NavigationMode) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every navigation so tests can assert on side effects
    #[derive(Default)]
    pub struct RecordingNavigator {
        visits: Mutex<Vec<(Location, NavigationMode)>>,
    }

    impl RecordingNavigator {
        pub fn visits(&self) -> Vec<(Location, NavigationMode)> {
            self.visits.lock().unwrap().clone()
        }

        pub fn count_to(&self, location: &Location, mode: NavigationMode) -> usize {
            self.visits()
                .iter()
                .filter(|(to, m)| to == location && *m == mode)
                .count()
        }

        pub fn last(&self) -> Option<(Location, NavigationMode)> {
            self.visits().last().cloned()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, to: &Location, mode: NavigationMode) {
            self.visits.lock().unwrap().push((to.clone(), mode));
        }
    }
}
