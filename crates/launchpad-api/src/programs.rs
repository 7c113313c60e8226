use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource};
use launchpad_db::NewProgram;
use launchpad_types::{api::CreateProgramRequest, models::Program};

use crate::access::authorize;
use crate::error::{ApiError, FieldErrors};
use crate::extract::{Json, Path};
use crate::session::{CurrentUser, MaybeUser};
use crate::state::{AppState, blocking};

/// Active programs; admins also see inactive ones.
pub async fn list_programs(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<Vec<Program>>, ApiError> {
    authorize(user.as_ref(), Resource::Program, None, Action::Read)?;
    let active_only = !user.as_ref().is_some_and(|u| u.is_admin() && u.active);

    let programs = state.programs.clone();
    let programs = blocking(move || Ok(programs.list_programs(active_only)?)).await?;
    Ok(Json(programs))
}

pub async fn get_program(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Program>, ApiError> {
    authorize(None, Resource::Program, None, Action::Read)?;

    let programs = state.programs.clone();
    let program = blocking(move || Ok(programs.program_by_id(id)?)).await?;
    program.map(Json).ok_or(ApiError::not_found("Program"))
}

pub async fn create_program(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateProgramRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(Some(&user), Resource::Program, None, Action::Create)?;

    let mut errors = FieldErrors::default();
    errors.check(!req.name.trim().is_empty(), "name", "Name must not be empty");
    errors.check(
        !req.description.trim().is_empty(),
        "description",
        "Description must not be empty",
    );
    for (i, q) in req.questions.iter().enumerate() {
        errors.check(
            !q.question.trim().is_empty(),
            format!("questions[{i}]"),
            "Question must not be empty",
        );
    }
    errors.into_result()?;

    let new_program = NewProgram {
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        active: req.active,
        questions: req
            .questions
            .into_iter()
            .map(|q| (q.question.trim().to_string(), q.required))
            .collect(),
    };

    let programs = state.programs.clone();
    let program = blocking(move || Ok(programs.create_program(&new_program)?)).await?;

    info!(
        "Admin {} created program {} with {} questions",
        user.id,
        program.id,
        program.questions.len()
    );
    Ok((StatusCode::CREATED, Json(program)))
}
