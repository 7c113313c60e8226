use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ApplicationAnswer, ApplicationStatus, AuthenticatedUser, Role, User};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for register and login. The session itself travels in the
/// `session` cookie, never in the body.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

// -- Role switch --

/// `role` stays a raw string so an unknown value is reported as an invalid
/// role rather than a malformed body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSwitchRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleSwitchResponse {
    pub message: String,
    pub user: AuthenticatedUser,
}

// -- Startups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStartupRequest {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub stage: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub founded_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStartupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
}

// -- Programs --

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewQuestion {
    pub question: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProgramRequest {
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub questions: Vec<NewQuestion>,
}

// -- Applications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitApplicationRequest {
    pub startup_id: Uuid,
    pub program_id: Uuid,
    #[serde(default)]
    pub answers: Vec<ApplicationAnswer>,
}

/// `rating` is accepted as any integer and range-checked by the workflow.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub rating: i64,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub feedback_note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
}

// -- Forum --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub active: bool,
}
