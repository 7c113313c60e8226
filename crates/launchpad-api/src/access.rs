use tracing::warn;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource, can_access};
use launchpad_types::models::AuthenticatedUser;

use crate::error::ApiError;

/// Policy check for handlers: anonymous denials are 401, the rest 403.
pub fn authorize(
    user: Option<&AuthenticatedUser>,
    resource: Resource,
    owner_id: Option<Uuid>,
    action: Action,
) -> Result<(), ApiError> {
    if can_access(user, resource, owner_id, action) {
        return Ok(());
    }

    match user {
        None => Err(ApiError::Unauthorized),
        Some(user) => {
            warn!(
                "Denied {:?} on {:?} for user {} ({}, active={})",
                action, resource, user.id, user.role, user.active
            );
            Err(ApiError::Forbidden)
        }
    }
}
