use std::fmt;

/// A requested location: a path plus optional query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Self("/".to_string());
        }
        if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{}", trimmed))
        }
    }

    pub fn login() -> Self {
        Route::Login.location()
    }

    pub fn landing() -> Self {
        Route::LANDING.location()
    }

    /// Path component without query or fragment
    pub fn path(&self) -> &str {
        let end = self.0.find(['?', '#']).unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn route(&self) -> Option<Route> {
        Route::from_path(self.path())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Loans,
    Customers,
    Payments,
    Admin,
}

impl Route {
    /// Where a successful login lands when nothing was pending
    pub const LANDING: Route = Route::Dashboard;

    pub const ALL: [Route; 6] = [
        Route::Login,
        Route::Dashboard,
        Route::Loans,
        Route::Customers,
        Route::Payments,
        Route::Admin,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Loans => "/loans",
            Route::Customers => "/customers",
            Route::Payments => "/payments",
            Route::Admin => "/admin",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
            Route::Loans => "Loans",
            Route::Customers => "Customers",
            Route::Payments => "Payments",
            Route::Admin => "Admin",
        }
    }

    /// Match a path, ignoring a trailing slash and letter case
    pub fn from_path(path: &str) -> Option<Route> {
        let normalized = path.trim_end_matches('/');
        let normalized = if normalized.is_empty() { "/" } else { normalized };
        Self::ALL
            .into_iter()
            .find(|route| route.path().eq_ignore_ascii_case(normalized))
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn location(&self) -> Location {
        Location(self.path().to_string())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
