//! Role and ownership permission matrix.
//!
//! | Resource          | Read                                 | Create                  | Update / Delete      |
//! |-------------------|--------------------------------------|-------------------------|----------------------|
//! | StartupProfile    | anyone                               | STARTUP                 | owner or ADMIN       |
//! | Application       | ADMIN, MENTOR, owning STARTUP        | owning STARTUP          | ADMIN                |
//! | ApplicationReview | as Application                       | ADMIN or MENTOR         | ADMIN or MENTOR      |
//! | ForumPost         | anyone                               | any signed-in user      | author or ADMIN      |
//! | UserRecord        | ADMIN                                | ADMIN                   | ADMIN                |
//! | Program           | anyone                               | ADMIN                   | ADMIN                |
//!
//! `owner_id` is the id of the user owning the resource: the startup's user for
//! startup profiles, applications and reviews, the author for forum posts.
//! Deactivated users only get the "anyone" reads.

use uuid::Uuid;

use launchpad_types::models::{AuthenticatedUser, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    StartupProfile,
    Application,
    ApplicationReview,
    ForumPost,
    UserRecord,
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

fn is_public_read(resource: Resource) -> bool {
    matches!(
        resource,
        Resource::StartupProfile | Resource::ForumPost | Resource::Program
    )
}

pub fn can_access(
    user: Option<&AuthenticatedUser>,
    resource: Resource,
    owner_id: Option<Uuid>,
    action: Action,
) -> bool {
    if action == Action::Read && is_public_read(resource) {
        return true;
    }

    let Some(user) = user else {
        return false;
    };
    if !user.active {
        return false;
    }

    let owns = owner_id.is_some_and(|owner| owner == user.id);
    let admin = user.role == Role::Admin;
    let reviewer = matches!(user.role, Role::Admin | Role::Mentor);

    match (resource, action) {
        (Resource::StartupProfile, Action::Read) => true,
        (Resource::StartupProfile, Action::Create) => user.role == Role::Startup,
        (Resource::StartupProfile, Action::Update | Action::Delete) => owns || admin,

        (Resource::Application | Resource::ApplicationReview, Action::Read) => {
            reviewer || (user.role == Role::Startup && owns)
        }
        (Resource::Application, Action::Create) => user.role == Role::Startup && owns,
        (Resource::Application, Action::Update | Action::Delete) => admin,
        (Resource::ApplicationReview, Action::Create | Action::Update | Action::Delete) => reviewer,

        (Resource::ForumPost, Action::Read | Action::Create) => true,
        (Resource::ForumPost, Action::Update | Action::Delete) => owns || admin,

        (Resource::UserRecord, _) => admin,

        (Resource::Program, Action::Read) => true,
        (Resource::Program, Action::Create | Action::Update | Action::Delete) => admin,
    }
}
