use std::fmt;

use payloads::Role;

use crate::session::AuthState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Admin,
}

impl Route {
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Login | Route::Register => None,
            Route::Dashboard => Some(Role::Petitioner),
            Route::Admin => Some(Role::Admin),
        }
    }

    /// Landing page after login.
    pub fn home(role: Role) -> Self {
        match role {
            Role::Petitioner => Route::Dashboard,
            Role::Admin => Route::Admin,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
        };

        f.write_str(path)
    }
}

/// Where navigation to `route` actually lands.
///
/// Protected routes redirect to [`Route::Login`] when nobody is logged in or
/// the role does not match.
pub fn guard(route: Route, state: &AuthState) -> Route {
    match route.required_role() {
        None => route,
        Some(required) if state.role() == Some(required) => route,
        Some(_) => Route::Login,
    }
}
