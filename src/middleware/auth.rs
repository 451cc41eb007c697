use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};

use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::policy::{role_allowed, AuthContext};
use crate::services::identity::resolve_session;
use crate::AppState;

/// Name of the session cookie mirroring the bearer token.
pub const TOKEN_COOKIE: &str = "token";

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
const ADMIN_OR_PROVIDER: &[UserRole] = &[UserRole::Admin, UserRole::Provider];

fn not_authorized() -> AppError {
    AppError::Unauthorized("Not authorized to access this route".to_string())
}

/// Bearer header first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves the session token to an [`AuthContext`] request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = session_token(request.headers()).ok_or_else(not_authorized)?;
    let ctx = resolve_session(&state.db, &token, &state.config.jwt_secret).await?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

fn check_role(request: &Request, allowed: &[UserRole]) -> AppResult<()> {
    let ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(not_authorized)?;

    if !role_allowed(ctx.role(), allowed) {
        return Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            ctx.role().as_str()
        )));
    }
    Ok(())
}

/// Require admin role
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    check_role(&request, ADMIN_ONLY)?;
    Ok(next.run(request).await)
}

/// Require admin or provider role
pub async fn require_admin_or_provider(request: Request, next: Next) -> AppResult<Response> {
    check_role(&request, ADMIN_OR_PROVIDER)?;
    Ok(next.run(request).await)
}
