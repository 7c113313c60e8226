//! Application review workflow.
//!
//! A startup submits one application per program. Admins and mentors review
//! it, at most once each. An admin then moves it from PENDING to APPROVED or
//! REJECTED, exactly once. Uniqueness is enforced by the store, so two racing
//! requests can never both win.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource};
use launchpad_db::{
    ApplicationFilter, ApplicationRepository, Decision, NewApplication, NewReview, ProgramRepository,
    StartupRepository,
};
use launchpad_types::models::{
    Application, ApplicationAnswer, ApplicationDetail, ApplicationReview, ApplicationStatus, AuthenticatedUser,
    Program, Role,
};

use crate::access::authorize;
use crate::error::{ApiError, FieldErrors};

pub const MAX_COMMENT_LEN: usize = 2000;

const DUPLICATE_APPLICATION: &str = "This startup has already applied to this program";
const DUPLICATE_REVIEW: &str = "You have already reviewed this application";

pub struct ApplicationWorkflow {
    startups: Arc<dyn StartupRepository>,
    programs: Arc<dyn ProgramRepository>,
    applications: Arc<dyn ApplicationRepository>,
}

impl ApplicationWorkflow {
    pub fn new(
        startups: Arc<dyn StartupRepository>,
        programs: Arc<dyn ProgramRepository>,
        applications: Arc<dyn ApplicationRepository>,
    ) -> Self {
        Self {
            startups,
            programs,
            applications,
        }
    }

    pub fn submit(
        &self,
        caller: &AuthenticatedUser,
        startup_id: Uuid,
        program_id: Uuid,
        answers: Vec<ApplicationAnswer>,
    ) -> Result<Application, ApiError> {
        let startup = self
            .startups
            .startup_by_id(startup_id)?
            .ok_or(ApiError::not_found("Startup"))?;
        authorize(Some(caller), Resource::Application, Some(startup.user_id), Action::Create)?;

        let program = self
            .programs
            .program_by_id(program_id)?
            .ok_or(ApiError::not_found("Program"))?;
        let answers = validate_answers(&program, answers)?;

        if self.applications.application_for(startup_id, program_id)?.is_some() {
            return Err(ApiError::conflict(DUPLICATE_APPLICATION));
        }

        // The check above is only a fast path; a concurrent submit is caught here.
        let application = self
            .applications
            .insert_application(&NewApplication {
                startup_id,
                program_id,
                answers,
            })
            .map_err(|e| {
                if e.is_unique_violation() {
                    ApiError::conflict(DUPLICATE_APPLICATION)
                } else {
                    e.into()
                }
            })?;

        info!(
            "Startup {} applied to program {} (application {})",
            startup.id, program.id, application.id
        );
        Ok(application)
    }

    pub fn review(
        &self,
        caller: &AuthenticatedUser,
        application_id: Uuid,
        rating: i64,
        comment: &str,
    ) -> Result<ApplicationReview, ApiError> {
        authorize(Some(caller), Resource::ApplicationReview, None, Action::Create)?;

        let application = self
            .applications
            .application_by_id(application_id)?
            .ok_or(ApiError::not_found("Application"))?;

        let comment = comment.trim();
        let mut errors = FieldErrors::default();
        errors.check((1..=5).contains(&rating), "rating", "Rating must be between 1 and 5");
        errors.check(!comment.is_empty(), "comment", "Comment is required");
        errors.check(
            comment.chars().count() <= MAX_COMMENT_LEN,
            "comment",
            format!("Comment must be at most {MAX_COMMENT_LEN} characters"),
        );
        errors.into_result()?;

        if self.applications.review_by(application.id, caller.id)?.is_some() {
            return Err(ApiError::conflict(DUPLICATE_REVIEW));
        }

        let review = self
            .applications
            .insert_review(&NewReview {
                application_id: application.id,
                reviewer_id: caller.id,
                // Range checked above.
                rating: rating as u8,
                comment: comment.to_string(),
            })
            .map_err(|e| {
                if e.is_unique_violation() {
                    ApiError::conflict(DUPLICATE_REVIEW)
                } else {
                    e.into()
                }
            })?;

        info!(
            "User {} reviewed application {} ({}/5)",
            caller.id, application.id, review.rating
        );
        Ok(review)
    }

    pub fn set_status(
        &self,
        caller: &AuthenticatedUser,
        application_id: Uuid,
        status: ApplicationStatus,
        feedback_note: Option<&str>,
    ) -> Result<Application, ApiError> {
        authorize(Some(caller), Resource::Application, None, Action::Update)?;

        if !status.is_terminal() {
            return Err(ApiError::invalid("status", "Status must be APPROVED or REJECTED"));
        }

        let feedback_note = feedback_note.map(str::trim).filter(|n| !n.is_empty());

        match self
            .applications
            .decide_application(application_id, status, feedback_note)?
        {
            Decision::Decided(application) => {
                info!(
                    "Application {} {} by {}",
                    application.id, application.status, caller.id
                );
                Ok(application)
            }
            Decision::AlreadyDecided(application) => Err(ApiError::conflict(format!(
                "Application has already been {}",
                application.status
            ))),
            Decision::Missing => Err(ApiError::not_found("Application")),
        }
    }

    pub fn get(&self, caller: &AuthenticatedUser, application_id: Uuid) -> Result<ApplicationDetail, ApiError> {
        let application = self
            .applications
            .application_by_id(application_id)?
            .ok_or(ApiError::not_found("Application"))?;

        let owner = self
            .startups
            .startup_by_id(application.startup_id)?
            .map(|s| s.user_id);
        authorize(Some(caller), Resource::Application, owner, Action::Read)?;

        let answers = self.applications.answers_for(application.id)?;
        let reviews = self.applications.reviews_for(application.id)?;
        Ok(ApplicationDetail {
            application,
            answers,
            reviews,
        })
    }

    /// Startups see their own applications; reviewers see everything.
    pub fn list(
        &self,
        caller: &AuthenticatedUser,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, ApiError> {
        if caller.role == Role::Startup {
            authorize(Some(caller), Resource::Application, Some(caller.id), Action::Read)?;
            let Some(startup) = self.startups.startup_by_owner(caller.id)? else {
                return Ok(Vec::new());
            };
            return Ok(self.applications.list_applications(ApplicationFilter {
                startup_id: Some(startup.id),
                status,
            })?);
        }

        authorize(Some(caller), Resource::Application, None, Action::Read)?;
        Ok(self.applications.list_applications(ApplicationFilter {
            startup_id: None,
            status,
        })?)
    }

    pub fn list_for_startup(
        &self,
        caller: &AuthenticatedUser,
        startup_id: Uuid,
    ) -> Result<Vec<Application>, ApiError> {
        let startup = self
            .startups
            .startup_by_id(startup_id)?
            .ok_or(ApiError::not_found("Startup"))?;
        authorize(Some(caller), Resource::Application, Some(startup.user_id), Action::Read)?;

        Ok(self.applications.list_applications(ApplicationFilter {
            startup_id: Some(startup.id),
            status: None,
        })?)
    }
}

/// Answers must belong to the program, at most one per question, and cover
/// every required question.
fn validate_answers(program: &Program, answers: Vec<ApplicationAnswer>) -> Result<Vec<ApplicationAnswer>, ApiError> {
    if !program.active {
        return Err(ApiError::invalid("program_id", "Program is not accepting applications"));
    }

    let mut errors = FieldErrors::default();
    let mut answered = HashSet::new();
    let mut cleaned = Vec::with_capacity(answers.len());

    for (i, answer) in answers.into_iter().enumerate() {
        let field = format!("answers[{i}]");
        let Some(question) = program.questions.iter().find(|q| q.id == answer.question_id) else {
            errors.push(field, "Question does not belong to this program");
            continue;
        };
        if !answered.insert(question.id) {
            errors.push(field, "Question answered more than once");
            continue;
        }

        let text = answer.answer.trim();
        if text.is_empty() {
            if question.required {
                errors.push(field, "Answer must not be empty");
            }
            answered.remove(&question.id);
            continue;
        }
        cleaned.push(ApplicationAnswer {
            question_id: question.id,
            answer: text.to_string(),
        });
    }

    for question in program.questions.iter().filter(|q| q.required) {
        if !answered.contains(&question.id) {
            errors.push(
                format!("answers.{}", question.id),
                format!("Missing answer to required question: {}", question.question),
            );
        }
    }

    errors.into_result()?;
    Ok(cleaned)
}
