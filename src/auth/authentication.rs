use rocket::Request;
use rocket::catch;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use tracing::{Instrument, error, info, warn};

use super::{AuthState, Profile};
use crate::db::{get_profile, get_session_by_token};
use crate::error::AppError;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "session_token";

/// A signed-in profile together with the token that authenticated it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub profile: Profile,
}

/// Looks the token up and returns the session's profile if the session is
/// still valid.
pub async fn resolve_session(store: &Store, token: &str) -> Result<Option<AuthSession>, AppError> {
    let Some(session) = get_session_by_token(store.pool(), token).await? else {
        return Ok(None);
    };

    if !session.is_valid() {
        warn!(user_id = %session.user_id, "Session token expired");
        return Ok(None);
    }

    let profile = get_profile(store, &session.user_id).await?;

    Ok(profile.map(|profile| AuthSession {
        token: session.token,
        profile,
    }))
}

/// Resolves the session cookie once per request.
pub async fn request_auth_state(request: &Request<'_>) -> AuthState {
    request
        .local_cache_async(
            lookup_auth_state(request).instrument(tracing::info_span!("session_guard")),
        )
        .await
        .clone()
}

async fn lookup_auth_state(request: &Request<'_>) -> AuthState {
    let Some(token) = request
        .cookies()
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
    else {
        return AuthState::Anonymous;
    };

    let Some(store) = request.rocket().state::<Store>() else {
        error!("Store not found in managed state");
        return AuthState::Pending;
    };

    match resolve_session(store, &token).await {
        Ok(Some(session)) => {
            info!(
                profile_id = %session.profile.id,
                role = %session.profile.role,
                "Profile authenticated via session token"
            );
            AuthState::Authenticated(session)
        }
        Ok(None) => {
            warn!("Session token did not resolve to a profile");
            AuthState::Anonymous
        }
        Err(err) => {
            err.log_and_record("Session lookup");
            AuthState::Pending
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request_auth_state(request).await {
            AuthState::Authenticated(session) => Outcome::Success(session),
            AuthState::Anonymous => Outcome::Error((Status::Unauthorized, ())),
            AuthState::Pending => Outcome::Error((Status::ServiceUnavailable, ())),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Profile {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        request
            .guard::<AuthSession>()
            .await
            .map(|session| session.profile)
    }
}

/// The session state as seen by page routes; never fails.
pub struct Viewer(pub AuthState);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Viewer {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(Viewer(request_auth_state(request).await))
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::Unauthorized,
        Json(json!({
            "error": "Unauthorized",
            "message": "Authentication required"
        })),
    )
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<Value>> {
    warn!("Forbidden access attempt");
    Custom(
        Status::Forbidden,
        Json(json!({
            "error": "Forbidden",
            "message": "You do not have access to this resource"
        })),
    )
}

#[catch(503)]
pub fn session_unavailable(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::ServiceUnavailable,
        Json(json!({ "status": "loading" })),
    )
}
