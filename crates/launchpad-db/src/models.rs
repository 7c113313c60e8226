/// Database row types: these map directly to SQLite rows.
/// Distinct from launchpad-types models to keep the DB layer independent;
/// the `into_*` conversions validate ids, enums and timestamps on the way out.
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use launchpad_types::models::{
    Application, ApplicationAnswer, ApplicationQuestion, ApplicationReview, ForumComment, ForumPost, Program, Startup,
    User,
};

use crate::DbError;
use crate::repository::StoredUser;

/// Timestamps are stored as RFC 3339 with a fixed precision so that they sort
/// lexicographically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_uuid(entity: &'static str, id: &str, value: &str) -> Result<Uuid, DbError> {
    value.parse().map_err(|e| DbError::corrupt(entity, id, e))
}

fn parse_time(entity: &'static str, id: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::corrupt(entity, id, e))
}

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn into_stored(self) -> Result<StoredUser, DbError> {
        let user = User {
            id: parse_uuid("user", &self.id, &self.id)?,
            role: self.role.parse().map_err(|e| DbError::corrupt("user", &self.id, e))?,
            created_at: parse_time("user", &self.id, &self.created_at)?,
            email: self.email,
            name: self.name,
            active: self.is_active,
        };
        Ok(StoredUser {
            user,
            password_hash: self.password,
        })
    }

    pub fn into_user(self) -> Result<User, DbError> {
        Ok(self.into_stored()?.user)
    }
}

pub struct StartupRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub industry: String,
    pub stage: String,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
    pub created_at: String,
}

impl StartupRow {
    pub fn into_startup(self) -> Result<Startup, DbError> {
        Ok(Startup {
            id: parse_uuid("startup", &self.id, &self.id)?,
            user_id: parse_uuid("startup", &self.id, &self.user_id)?,
            created_at: parse_time("startup", &self.id, &self.created_at)?,
            name: self.name,
            description: self.description,
            industry: self.industry,
            stage: self.stage,
            website: self.website,
            founded_year: self.founded_year,
        })
    }
}

pub struct ProgramRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
}

pub struct QuestionRow {
    pub id: String,
    pub program_id: String,
    pub question: String,
    pub required: bool,
}

impl QuestionRow {
    pub fn into_question(self) -> Result<ApplicationQuestion, DbError> {
        Ok(ApplicationQuestion {
            id: parse_uuid("question", &self.id, &self.id)?,
            program_id: parse_uuid("question", &self.id, &self.program_id)?,
            question: self.question,
            required: self.required,
        })
    }
}

impl ProgramRow {
    pub fn into_program(self, questions: Vec<QuestionRow>) -> Result<Program, DbError> {
        Ok(Program {
            id: parse_uuid("program", &self.id, &self.id)?,
            created_at: parse_time("program", &self.id, &self.created_at)?,
            name: self.name,
            description: self.description,
            active: self.is_active,
            questions: questions
                .into_iter()
                .map(QuestionRow::into_question)
                .collect::<Result<_, _>>()?,
        })
    }
}

pub struct ApplicationRow {
    pub id: String,
    pub startup_id: String,
    pub program_id: String,
    pub status: String,
    pub feedback_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApplicationRow {
    pub fn into_application(self) -> Result<Application, DbError> {
        Ok(Application {
            id: parse_uuid("application", &self.id, &self.id)?,
            startup_id: parse_uuid("application", &self.id, &self.startup_id)?,
            program_id: parse_uuid("application", &self.id, &self.program_id)?,
            status: self
                .status
                .parse()
                .map_err(|e| DbError::corrupt("application", &self.id, e))?,
            created_at: parse_time("application", &self.id, &self.created_at)?,
            updated_at: parse_time("application", &self.id, &self.updated_at)?,
            feedback_note: self.feedback_note,
        })
    }
}

pub struct AnswerRow {
    pub application_id: String,
    pub question_id: String,
    pub answer: String,
}

impl AnswerRow {
    pub fn into_answer(self) -> Result<ApplicationAnswer, DbError> {
        Ok(ApplicationAnswer {
            question_id: parse_uuid("answer", &self.application_id, &self.question_id)?,
            answer: self.answer,
        })
    }
}

pub struct ReviewRow {
    pub id: String,
    pub application_id: String,
    pub reviewer_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

impl ReviewRow {
    pub fn into_review(self) -> Result<ApplicationReview, DbError> {
        Ok(ApplicationReview {
            id: parse_uuid("review", &self.id, &self.id)?,
            application_id: parse_uuid("review", &self.id, &self.application_id)?,
            reviewer_id: parse_uuid("review", &self.id, &self.reviewer_id)?,
            rating: u8::try_from(self.rating).map_err(|e| DbError::corrupt("review", &self.id, e))?,
            created_at: parse_time("review", &self.id, &self.created_at)?,
            comment: self.comment,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PostRow {
    pub fn into_post(self) -> Result<ForumPost, DbError> {
        Ok(ForumPost {
            id: parse_uuid("post", &self.id, &self.id)?,
            author_id: parse_uuid("post", &self.id, &self.author_id)?,
            created_at: parse_time("post", &self.id, &self.created_at)?,
            updated_at: parse_time("post", &self.id, &self.updated_at)?,
            title: self.title,
            content: self.content,
        })
    }
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
}

impl CommentRow {
    pub fn into_comment(self) -> Result<ForumComment, DbError> {
        Ok(ForumComment {
            id: parse_uuid("comment", &self.id, &self.id)?,
            post_id: parse_uuid("comment", &self.id, &self.post_id)?,
            author_id: parse_uuid("comment", &self.id, &self.author_id)?,
            created_at: parse_time("comment", &self.id, &self.created_at)?,
            content: self.content,
        })
    }
}
