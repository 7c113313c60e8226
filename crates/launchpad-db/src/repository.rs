//! Persistence interface used by the API layer.
//!
//! The traits are synchronous; async callers run them on the blocking pool.
//! [`crate::Database`] implements all of them, tests may substitute their own.

use uuid::Uuid;

use launchpad_types::models::{
    Application, ApplicationAnswer, ApplicationReview, ApplicationStatus, ForumComment, ForumPost, PlatformStats,
    Program, Role, Startup, User,
};

use crate::DbError;

/// A user together with the password hash, for credential checks only.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

pub trait UserRepository: Send + Sync {
    /// Fails with [`DbError::UniqueViolation`] when the email is taken.
    fn create_user(&self, user: &NewUser) -> Result<User, DbError>;
    fn user_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, DbError>;
    /// Case-insensitive.
    fn user_by_email(&self, email: &str) -> Result<Option<StoredUser>, DbError>;
    fn list_users(&self) -> Result<Vec<User>, DbError>;
    fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, DbError>;
    /// Compare-and-set: only replaces the hash while it still equals
    /// `current_hash`. Returns `false` when the user is gone or the password
    /// already changed.
    fn replace_password(&self, id: Uuid, current_hash: &str, new_hash: &str) -> Result<bool, DbError>;
    fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, DbError>;
}

pub struct NewStartup {
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub industry: String,
    pub stage: String,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct StartupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
}

pub trait StartupRepository: Send + Sync {
    /// Fails with [`DbError::UniqueViolation`] when the owner already has a startup.
    fn create_startup(&self, startup: &NewStartup) -> Result<Startup, DbError>;
    fn startup_by_id(&self, id: Uuid) -> Result<Option<Startup>, DbError>;
    fn startup_by_owner(&self, user_id: Uuid) -> Result<Option<Startup>, DbError>;
    fn update_startup(&self, id: Uuid, changes: &StartupChanges) -> Result<Option<Startup>, DbError>;
    /// Fails with [`DbError::ForeignKeyViolation`] while the startup has
    /// applications.
    fn delete_startup(&self, id: Uuid) -> Result<bool, DbError>;
}

pub struct NewProgram {
    pub name: String,
    pub description: String,
    pub active: bool,
    /// (question, required), in display order.
    pub questions: Vec<(String, bool)>,
}

pub trait ProgramRepository: Send + Sync {
    /// Program and questions are written in one transaction.
    fn create_program(&self, program: &NewProgram) -> Result<Program, DbError>;
    fn program_by_id(&self, id: Uuid) -> Result<Option<Program>, DbError>;
    fn list_programs(&self, active_only: bool) -> Result<Vec<Program>, DbError>;
}

pub struct NewApplication {
    pub startup_id: Uuid,
    pub program_id: Uuid,
    pub answers: Vec<ApplicationAnswer>,
}

pub struct NewReview {
    pub application_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationFilter {
    pub startup_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

/// Outcome of moving an application out of PENDING.
#[derive(Debug)]
pub enum Decision {
    Decided(Application),
    AlreadyDecided(Application),
    Missing,
}

pub trait ApplicationRepository: Send + Sync {
    fn application_by_id(&self, id: Uuid) -> Result<Option<Application>, DbError>;
    fn application_for(&self, startup_id: Uuid, program_id: Uuid) -> Result<Option<Application>, DbError>;
    /// Application (PENDING) and answers are written in one transaction.
    /// Fails with [`DbError::UniqueViolation`] when the pair already applied.
    fn insert_application(&self, application: &NewApplication) -> Result<Application, DbError>;
    fn list_applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>, DbError>;
    fn answers_for(&self, application_id: Uuid) -> Result<Vec<ApplicationAnswer>, DbError>;
    /// Only a PENDING application changes; the status check and the update
    /// happen atomically.
    fn decide_application(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        feedback_note: Option<&str>,
    ) -> Result<Decision, DbError>;

    fn review_by(&self, application_id: Uuid, reviewer_id: Uuid) -> Result<Option<ApplicationReview>, DbError>;
    /// Fails with [`DbError::UniqueViolation`] when the reviewer already
    /// reviewed this application.
    fn insert_review(&self, review: &NewReview) -> Result<ApplicationReview, DbError>;
    fn reviews_for(&self, application_id: Uuid) -> Result<Vec<ApplicationReview>, DbError>;
}

pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

pub trait PostRepository: Send + Sync {
    fn create_post(&self, post: &NewPost) -> Result<ForumPost, DbError>;
    fn post_by_id(&self, id: Uuid) -> Result<Option<ForumPost>, DbError>;
    fn update_post(&self, id: Uuid, title: Option<&str>, content: Option<&str>) -> Result<Option<ForumPost>, DbError>;
    /// Also removes the post's comments.
    fn delete_post(&self, id: Uuid) -> Result<bool, DbError>;

    /// Fails with [`DbError::ForeignKeyViolation`] when the post is gone.
    fn create_comment(&self, comment: &NewComment) -> Result<ForumComment, DbError>;
    /// Oldest first.
    fn comments_for(&self, post_id: Uuid) -> Result<Vec<ForumComment>, DbError>;
}

pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

/// Read-only aggregates for the admin dashboard.
pub trait StatsRepository: Send + Sync {
    /// `recent` caps the recent users and applications lists.
    fn platform_stats(&self, recent: usize) -> Result<PlatformStats, DbError>;
}
