// taskdesk/src/guard.rs

use crate::session::{Session, SessionStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access { Allow, RedirectToLogin }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route { Root, Login, Register, Dashboard }

impl Route {
    pub fn is_protected(&self) -> bool { matches!(self, Self::Dashboard) }
}

/// Allow iff there is a session and its token is non-empty.
pub fn check(session: Option<&Session>) -> Access {
    match session {
        Some(s) if !s.token.trim().is_empty() => Access::Allow,
        _ => Access::RedirectToLogin,
    }
}

/// Re-reads the store on every call; nothing is cached between navigations.
#[derive(Clone)]
pub struct AccessGuard {
    store: SessionStore,
}

impl AccessGuard {
    pub fn new(store: SessionStore) -> Self { Self { store } }

    pub fn evaluate(&self) -> Access { check(self.store.current().as_ref()) }

    /// Where a navigation to `route` actually lands.
    pub fn resolve(&self, route: Route) -> Route {
        match route {
            Route::Root => Route::Login,
            r if r.is_protected() && self.evaluate() == Access::RedirectToLogin => Route::Login,
            r => r,
        }
    }
}
