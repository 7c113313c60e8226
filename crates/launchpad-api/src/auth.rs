use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{info, warn};

use launchpad_auth::password::{burn_verification, hash_password, verify_password};
use launchpad_db::NewUser;
use launchpad_types::{
    api::{LoginRequest, MessageResponse, RegisterRequest, RequestResetRequest, ResetPasswordRequest, UserResponse},
    models::{AuthenticatedUser, Role},
};

use crate::email;
use crate::error::{ApiError, FieldErrors};
use crate::extract::Json;
use crate::session::{CurrentUser, cleared_session_cookie, session_cookie};
use crate::state::{AppState, blocking};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 2;

/// Same answer whether or not the address has an account.
pub const RESET_REQUESTED: &str = "If an account exists with that email, a password reset link has been sent";

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    let mut errors = FieldErrors::default();
    errors.check(is_valid_email(&email), "email", "Invalid email address");
    errors.check(
        req.password.chars().count() >= MIN_PASSWORD_LEN,
        "password",
        format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
    );
    errors.check(
        name.chars().count() >= MIN_NAME_LEN,
        "name",
        format!("Name must be at least {MIN_NAME_LEN} characters"),
    );
    errors.check(
        req.role != Role::Admin,
        "role",
        "Role must be one of STARTUP, MENTOR, INVESTOR",
    );
    errors.into_result()?;

    let users = state.users.clone();
    let user = blocking(move || {
        if users.user_by_email(&email)?.is_some() {
            return Err(ApiError::conflict("User already exists"));
        }
        let password_hash = hash_password(&req.password)?;
        Ok(users.create_user(&NewUser {
            email,
            name,
            password_hash,
            role: req.role,
        })?)
    })
    .await?;

    info!("Registered user {} ({})", user.id, user.role);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();
    errors.check(!req.email.trim().is_empty(), "email", "Email is required");
    errors.check(!req.password.is_empty(), "password", "Password is required");
    errors.into_result()?;

    let users = state.users.clone();
    let stored = blocking(move || {
        let Some(stored) = users.user_by_email(req.email.trim())? else {
            burn_verification(&req.password);
            return Ok(None);
        };
        if verify_password(&req.password, &stored.password_hash)? {
            Ok(Some(stored))
        } else {
            Ok(None)
        }
    })
    .await?;

    let Some(stored) = stored else {
        warn!("Failed login attempt");
        return Err(ApiError::InvalidCredentials);
    };
    if !stored.user.active {
        warn!("Login attempt for deactivated user {}", stored.user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue_session(&AuthenticatedUser::from(&stored.user))?;
    info!("User {} logged in", stored.user.id);

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, state.config.secure_cookies))],
        Json(UserResponse {
            message: "Login successful".to_string(),
            user: stored.user,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cleared_session_cookie(state.config.secure_cookies))],
        Json(MessageResponse::new("Logged out successfully")),
    )
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}

pub async fn request_reset(
    State(state): State<AppState>,
    Json(req): Json<RequestResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::invalid("email", "Invalid email address"));
    }

    let users = state.users.clone();
    let stored = blocking(move || Ok(users.user_by_email(&email)?)).await?;

    match stored {
        Some(stored) if stored.user.active => {
            let token = state.tokens.issue_reset(stored.user.id, &stored.password_hash)?;
            let link = email::reset_link(&state.config.app_url, &token);
            email::dispatch(
                state.mailer.clone(),
                stored.user.email.clone(),
                "Reset your password",
                email::reset_email_body(&stored.user.name, &link),
            );
            info!("Password reset requested for user {}", stored.user.id);
        }
        _ => info!("Password reset requested for unknown or inactive account"),
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let claims = state.tokens.verify_reset(&req.token)?;

    let users = state.users.clone();
    blocking(move || {
        let stored = users.user_by_id(claims.sub)?.ok_or(ApiError::not_found("User"))?;
        // The fingerprint changes with the password, which spends the token.
        if !claims.is_current_for(&stored.password_hash) {
            return Err(ApiError::InvalidToken);
        }
        let password_hash = hash_password(&req.password)?;
        // Another request with the same token may have won while we hashed.
        if !users.replace_password(stored.user.id, &stored.password_hash, &password_hash)? {
            warn!("Reset token for user {} was spent concurrently", stored.user.id);
            return Err(ApiError::InvalidToken);
        }
        info!("Password reset for user {}", stored.user.id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        for bad in ["", "a", "@x.com", "a@", "a@x", "a@@x.com", "a b@x.com", "a@.com", "a@x."] {
            assert!(!is_valid_email(bad), "{bad:?}");
        }
    }
}
