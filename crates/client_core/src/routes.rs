//! Navigable screens and the access rules checked before entering them.

use std::fmt;

use shared::domain::{MovieId, ScreeningId};

use crate::auth::AuthSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Movies,
    MovieDetail(MovieId),
    Booking(ScreeningId),
    Profile,
    Login,
    Register,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub guest_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    /// Send the visitor to the login screen, then back to `redirect`.
    RedirectToLogin { redirect: String },
    RedirectHome,
}

impl Route {
    pub fn meta(&self) -> RouteMeta {
        match self {
            Route::Booking(_) | Route::Profile => RouteMeta {
                requires_auth: true,
                ..RouteMeta::default()
            },
            Route::Login | Route::Register => RouteMeta {
                guest_only: true,
                ..RouteMeta::default()
            },
            Route::Admin => RouteMeta {
                requires_auth: true,
                requires_admin: true,
                guest_only: false,
            },
            Route::Home | Route::Movies | Route::MovieDetail(_) => RouteMeta::default(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Movies => "/movies".to_string(),
            Route::MovieDetail(id) => format!("/movies/{}", id.0),
            Route::Booking(id) => format!("/booking/{}", id.0),
            Route::Profile => "/profile".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Admin => "/admin".to_string(),
        }
    }

    /// Parses a path produced by [`Route::path`]. Query strings and a
    /// trailing slash are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => Route::Home,
            ["movies"] => Route::Movies,
            ["movies", id] => Route::MovieDetail(MovieId(id.parse().ok()?)),
            ["booking", id] => Route::Booking(ScreeningId(id.parse().ok()?)),
            ["profile"] => Route::Profile,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["admin"] => Route::Admin,
            _ => return None,
        };
        Some(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Decides whether the current session may enter `route`.
pub fn guard(route: &Route, session: &AuthSession) -> Navigation {
    decide(route.meta(), &route.path(), session.is_authenticated(), session.is_admin())
}

fn decide(meta: RouteMeta, target: &str, authenticated: bool, admin: bool) -> Navigation {
    if meta.requires_auth && !authenticated {
        return Navigation::RedirectToLogin {
            redirect: target.to_string(),
        };
    }
    if meta.requires_admin && !admin {
        return Navigation::RedirectHome;
    }
    if meta.guest_only && authenticated {
        return Navigation::RedirectHome;
    }
    Navigation::Allow
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
