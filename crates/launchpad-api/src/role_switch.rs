use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use launchpad_auth::token::TokenService;
use launchpad_db::UserRepository;
use launchpad_types::{
    api::{RoleSwitchRequest, RoleSwitchResponse},
    models::{AuthenticatedUser, Role},
};

use crate::error::ApiError;
use crate::extract::Json;
use crate::session::{CurrentUser, session_cookie};
use crate::state::{AppState, blocking};

/// Lets a user change their own role. The new role is persisted and a fresh
/// session token is issued for it; tokens carrying the old role stop
/// resolving.
pub struct RoleSwitch {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

pub struct SwitchedRole {
    pub user: AuthenticatedUser,
    pub token: String,
}

impl RoleSwitch {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub fn switch_role(
        &self,
        caller: &AuthenticatedUser,
        user_id: Uuid,
        new_role: &str,
    ) -> Result<SwitchedRole, ApiError> {
        if caller.id != user_id || !caller.active {
            return Err(ApiError::Forbidden);
        }
        let role: Role = new_role
            .parse()
            .map_err(|_| ApiError::InvalidRole(new_role.to_string()))?;

        // Gone between session resolution and now.
        let user = self.users.update_role(user_id, role)?.ok_or(ApiError::Unauthorized)?;
        let user = AuthenticatedUser::from(&user);
        let token = self.tokens.issue_session(&user)?;

        info!("User {} switched role from {} to {}", user.id, caller.role, user.role);
        Ok(SwitchedRole { user, token })
    }
}

pub async fn switch_role(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<RoleSwitchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let switched = blocking(move || st.role_switch.switch_role(&caller, caller.id, &req.role)).await?;

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&switched.token, state.config.secure_cookies),
        )],
        Json(RoleSwitchResponse {
            message: "Role updated successfully".to_string(),
            user: switched.user,
        }),
    ))
}
