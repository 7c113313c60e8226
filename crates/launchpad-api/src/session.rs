//! Session resolution: request token to current user.
//!
//! The token comes from the `session` cookie, or failing that from an
//! `Authorization: Bearer` header. A token only resolves when its signature,
//! expiry and purpose check out, its user still exists, and the role it
//! carries is still the user's role. Anything else is anonymous.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use launchpad_auth::token::SESSION_TTL;
use launchpad_types::models::AuthenticatedUser;

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner, blocking};

pub const SESSION_COOKIE: &str = "session";

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a session token. Token problems give `Ok(None)`; store failures
/// are errors.
pub async fn current_user(state: &AppStateInner, token: Option<&str>) -> Result<Option<AuthenticatedUser>, ApiError> {
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = match state.tokens.verify_session(token) {
        Ok(claims) => claims,
        Err(_) => return Ok(None),
    };

    let users = state.users.clone();
    let user_id = claims.sub;
    let stored = blocking(move || Ok(users.user_by_id(user_id)?)).await?;

    let Some(stored) = stored else {
        debug!("Session for unknown user {}", claims.sub);
        return Ok(None);
    };

    if stored.user.role != claims.role {
        debug!(
            "Stale session for user {}: token role {}, current role {}",
            claims.sub, claims.role, stored.user.role
        );
        return Ok(None);
    }

    Ok(Some(AuthenticatedUser::from(&stored.user)))
}

/// Caller, if signed in.
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        current_user(state, token.as_deref()).await.map(MaybeUser)
    }
}

/// Signed-in caller; rejects with 401 otherwise.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(CurrentUser).ok_or(ApiError::Unauthorized)
    }
}

pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE,
        token,
        SESSION_TTL.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn cleared_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
