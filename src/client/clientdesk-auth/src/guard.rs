//! Role-gated route resolution.
//!
//! Everything here is a pure function of the session state handed in; the
//! live lookups happen in [`SessionContext::navigate`](crate::SessionContext::navigate).

use std::fmt;

use crate::{CurrentUser, Role};

/// A client view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/login`, public.
    Login,
    /// `/admin`, user and customer management.
    Admin,
    /// `/customer`, the signed-in customer's own page.
    Customer,
    /// `/`, redirects by role.
    Root,
    /// Anything else.
    Unknown(String),
}

impl Route {
    /// Parses a path. Matching ignores case, query, fragment and trailing slashes.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        match trimmed.to_ascii_lowercase().as_str() {
            "" => Route::Root,
            "/login" => Route::Login,
            "/admin" => Route::Admin,
            "/customer" => Route::Customer,
            _ => Route::Unknown(path.to_string()),
        }
    }

    /// Returns the canonical path.
    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::Admin => "/admin",
            Route::Customer => "/customer",
            Route::Root => "/",
            Route::Unknown(path) => path,
        }
    }

    /// Returns the role a view is gated on.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Admin => Some(Role::Admin),
            Route::Customer => Some(Role::Customer),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of guarding a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested view.
    Render,
    /// Go elsewhere instead.
    Redirect(Route),
}

/// Returns the home view for a role: admins get `/admin`, everyone else `/customer`.
pub fn home_for(role: Option<&Role>) -> Route {
    match role {
        Some(Role::Admin) => Route::Admin,
        _ => Route::Customer,
    }
}

/// Decides whether a protected view may render.
///
/// A session that is valid but carries no decodable identity is sent to
/// the login view.
pub fn guard(
    is_authenticated: bool,
    user: Option<&CurrentUser>,
    required: Option<&Role>,
) -> GuardDecision {
    let user = match (is_authenticated, user) {
        (true, Some(user)) => user,
        _ => return GuardDecision::Redirect(Route::Login),
    };

    match required {
        Some(role) if !user.has_role(role) => GuardDecision::Redirect(home_for(user.role.as_ref())),
        _ => GuardDecision::Render,
    }
}

/// Applies the routing table to `route`.
pub fn resolve(route: &Route, is_authenticated: bool, user: Option<&CurrentUser>) -> GuardDecision {
    let signed_in = if is_authenticated { user } else { None };

    match route {
        Route::Login => match signed_in {
            Some(user) => GuardDecision::Redirect(home_for(user.role.as_ref())),
            None => GuardDecision::Render,
        },
        Route::Admin | Route::Customer => guard(is_authenticated, user, route.required_role().as_ref()),
        Route::Root => match signed_in {
            Some(user) => GuardDecision::Redirect(home_for(user.role.as_ref())),
            None => GuardDecision::Redirect(Route::Login),
        },
        Route::Unknown(_) => GuardDecision::Redirect(Route::Login),
    }
}
