use super::{AuthSession, Profile, Role};

pub const LOGIN_PATH: &str = "/auth";

/// What the session lookup for a request produced.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// The session could not be resolved yet (the store is unreachable).
    Pending,
    Anonymous,
    Authenticated(AuthSession),
}

impl AuthState {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthState::Authenticated(session) => Some(&session.profile),
            AuthState::Pending | AuthState::Anonymous => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    Loading,
    RedirectToLogin,
    RedirectHome(&'static str),
    Render(Profile),
}

/// Decides whether a page renders for the resolved session. `required` is the
/// role a page is restricted to, if any.
pub fn route_access(state: &AuthState, required: Option<Role>) -> RouteDecision {
    match state {
        AuthState::Pending => RouteDecision::Loading,
        AuthState::Anonymous => RouteDecision::RedirectToLogin,
        AuthState::Authenticated(session) => match required {
            Some(role) if role != session.profile.role => {
                RouteDecision::RedirectHome(session.profile.role.home_path())
            }
            _ => RouteDecision::Render(session.profile.clone()),
        },
    }
}
