use axum::{extract::State, Extension};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::entities::user;
use crate::error::AppResult;
use crate::middleware::auth::TOKEN_COOKIE;
use crate::policy::AuthContext;
use crate::services::identity::{self, RegisterRequest, UserProfile};
use crate::services::booking;
use crate::utils::extract::ApiJson;
use crate::utils::jwt::create_token;
use crate::utils::response::ApiResponse;
use crate::{AppState, Config};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadProfileRequest {
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct FinishBookingRequest {
    pub booking: uuid::Uuid,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: user::Model,
}

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .max_age(time::Duration::days(config.jwt_cookie_expire_days))
        .build()
}

/// Issues a token for `user` and mirrors it into the session cookie.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: user::Model,
) -> AppResult<(CookieJar, ApiResponse<AuthPayload>)> {
    let token = create_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    let jar = jar.add(session_cookie(&state.config, token.clone()));
    Ok((jar, ApiResponse::ok(AuthPayload { token, user })))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(CookieJar, ApiResponse<AuthPayload>)> {
    let user = identity::register(&state.db, payload).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    start_session(&state, jar, user)
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, ApiResponse<AuthPayload>)> {
    let user = identity::login(&state.db, &payload.email, &payload.password).await?;
    start_session(&state, jar, user)
}

/// Clear the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<serde_json::Value>) {
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
    (jar, ApiResponse::empty())
}

pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = identity::profile(&state.db, ctx.user).await?;
    Ok(ApiResponse::ok(profile))
}

pub async fn upload_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(payload): ApiJson<UploadProfileRequest>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = identity::upload_profile(&state.db, &ctx, payload.image).await?;
    Ok(ApiResponse::ok(user))
}

/// Turn a finished booking into a booked-car entry
pub async fn booked(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(payload): ApiJson<FinishBookingRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = booking::finish(&state.db, &ctx, payload.booking).await?;
    Ok(ApiResponse::ok(profile))
}

/// List all users (admin)
pub async fn list_users(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<user::Model>>> {
    let users = identity::list_users(&state.db).await?;
    Ok(ApiResponse::collection(users))
}
