use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::{AuthSession, Profile, Role, SESSION_COOKIE, UserSession};
use crate::db::{authenticate, create_profile, create_user_session, invalidate_session};
use crate::env::Settings;
use crate::routes::landing_path;
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<Profile>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

async fn start_session(
    store: &Store,
    settings: &Settings,
    cookies: &CookieJar<'_>,
    profile: &Profile,
) -> ApiResult<()> {
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(settings.session_ttl_hours);

    create_user_session(store.pool(), &profile.id, &token, expires_at)
        .await
        .validate_custom()?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(rocket::time::Duration::hours(settings.session_ttl_hours));
    cookies.add_private(cookie);

    Ok(())
}

#[post("/auth/signup", data = "<signup>")]
#[instrument(skip_all)]
pub async fn api_signup(
    signup: Json<SignupRequest>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    settings: &State<Settings>,
) -> ApiResult<Custom<Json<LoginResponse>>> {
    let signup = signup.validate_custom()?;

    let profile = create_profile(
        store,
        &signup.name,
        &signup.email,
        &signup.password,
        signup.role,
    )
    .await
    .validate_custom()?;

    start_session(store, settings, cookies, &profile).await?;
    info!(profile_id = %profile.id, role = %profile.role, "Signed up");

    let redirect_url = landing_path(store, &profile).await.validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(LoginResponse {
            success: true,
            user: Some(profile),
            error: None,
            redirect_url: Some(redirect_url.to_string()),
        }),
    ))
}

#[post("/auth/login", data = "<login>")]
#[instrument(skip_all)]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    settings: &State<Settings>,
) -> ApiResult<Json<LoginResponse>> {
    let login = login.validate_custom()?;

    let Some(profile) = authenticate(store, &login.email, &login.password)
        .await
        .validate_custom()?
    else {
        return Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid email or password".to_string()),
            redirect_url: None,
        }));
    };

    start_session(store, settings, cookies, &profile).await?;
    info!(profile_id = %profile.id, "Signed in");

    let redirect_url = landing_path(store, &profile).await.validate_custom()?;

    Ok(Json(LoginResponse {
        success: true,
        user: Some(profile),
        error: None,
        redirect_url: Some(redirect_url.to_string()),
    }))
}

#[post("/auth/logout")]
pub async fn api_logout(
    session: AuthSession,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
) -> ApiResult<Status> {
    invalidate_session(store.pool(), &session.token)
        .await
        .validate_custom()?;
    cookies.remove_private(SESSION_COOKIE);

    info!(profile_id = %session.profile.id, "Signed out");
    Ok(Status::NoContent)
}

#[get("/me")]
pub fn api_me(profile: Profile) -> Json<Profile> {
    Json(profile)
}
