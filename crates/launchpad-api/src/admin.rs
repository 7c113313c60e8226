use axum::extract::State;
use tracing::info;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource};
use launchpad_types::{
    api::UpdateUserRequest,
    models::{PlatformStats, User},
};

use crate::access::authorize;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::session::CurrentUser;
use crate::state::{AppState, blocking};

/// How many recent users and applications the dashboard shows.
pub const RECENT_LIMIT: usize = 5;

pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<PlatformStats>, ApiError> {
    authorize(Some(&admin), Resource::UserRecord, None, Action::Read)?;

    let stats = state.stats.clone();
    let stats = blocking(move || Ok(stats.platform_stats(RECENT_LIMIT)?)).await?;
    Ok(Json(stats))
}

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    authorize(Some(&admin), Resource::UserRecord, None, Action::Read)?;

    let users = state.users.clone();
    let users = blocking(move || Ok(users.list_users()?)).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    authorize(Some(&admin), Resource::UserRecord, Some(id), Action::Read)?;

    let users = state.users.clone();
    let stored = blocking(move || Ok(users.user_by_id(id)?)).await?;
    stored.map(|s| Json(s.user)).ok_or(ApiError::not_found("User"))
}

/// Activate or deactivate an account. Roles only change through the role
/// switch.
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    authorize(Some(&admin), Resource::UserRecord, Some(id), Action::Update)?;
    if id == admin.id && !req.active {
        return Err(ApiError::invalid("active", "You cannot deactivate your own account"));
    }

    let users = state.users.clone();
    let user = blocking(move || users.set_active(id, req.active)?.ok_or(ApiError::not_found("User"))).await?;

    info!("Admin {} set user {} active={}", admin.id, user.id, user.active);
    Ok(Json(user))
}
