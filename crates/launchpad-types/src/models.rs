use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Roles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Startup,
    Mentor,
    Investor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Startup, Role::Mentor, Role::Investor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Startup => "STARTUP",
            Role::Mentor => "MENTOR",
            Role::Investor => "INVESTOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

// -- Application status --

/// PENDING is the only non-terminal state. An application moves to APPROVED
/// or REJECTED exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for ApplicationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "APPROVED" => Ok(ApplicationStatus::Approved),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// -- Users --

/// The caller of a request as seen by the policy layer. Never carries
/// password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Sanitized user record returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            active: user.active,
        }
    }
}

// -- Startups & programs --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Startup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub industry: String,
    pub stage: String,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationQuestion {
    pub id: Uuid,
    pub program_id: Uuid,
    pub question: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<ApplicationQuestion>,
}

// -- Applications --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub startup_id: Uuid,
    pub program_id: Uuid,
    pub status: ApplicationStatus,
    pub feedback_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationAnswer {
    pub question_id: Uuid,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// An application together with its answers and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub answers: Vec<ApplicationAnswer>,
    pub reviews: Vec<ApplicationReview>,
}

// -- Forum --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Admin dashboard --

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCounts {
    pub total_users: u64,
    pub total_startups: u64,
    pub total_mentors: u64,
    pub total_investors: u64,
    pub total_applications: u64,
    pub pending_applications: u64,
    pub total_posts: u64,
    pub total_comments: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: u64,
}

/// Admin dashboard snapshot. Distributions only list values that occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub counts: PlatformCounts,
    pub recent_users: Vec<User>,
    pub recent_applications: Vec<Application>,
    pub user_roles: Vec<RoleCount>,
    pub application_status: Vec<StatusCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_only_known_variants() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_screaming_case() {
        let json = serde_json::to_string(&Role::Investor).unwrap();
        assert_eq!(json, "\"INVESTOR\"");
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Approved.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert_eq!("REJECTED".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Rejected);
    }
}
