use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Datelike, Utc};
use tracing::info;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource};
use launchpad_db::{DbError, NewStartup, StartupChanges};
use launchpad_types::{
    api::{CreateStartupRequest, MessageResponse, UpdateStartupRequest},
    models::{Application, Startup},
};

use crate::access::authorize;
use crate::error::{ApiError, FieldErrors};
use crate::extract::{Json, Path};
use crate::session::CurrentUser;
use crate::state::{AppState, blocking};

const MIN_FOUNDED_YEAR: i32 = 1900;

fn check_text(errors: &mut FieldErrors, field: &str, value: &str) {
    errors.check(!value.trim().is_empty(), field, format!("{field} must not be empty"));
}

fn check_founded_year(errors: &mut FieldErrors, year: Option<i32>) {
    if let Some(year) = year {
        let current = Utc::now().year();
        errors.check(
            (MIN_FOUNDED_YEAR..=current).contains(&year),
            "founded_year",
            format!("Founded year must be between {MIN_FOUNDED_YEAR} and {current}"),
        );
    }
}

fn normalize_website(website: Option<String>) -> Option<String> {
    website.map(|w| w.trim().to_string()).filter(|w| !w.is_empty())
}

pub async fn create_startup(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateStartupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(Some(&user), Resource::StartupProfile, None, Action::Create)?;

    let mut errors = FieldErrors::default();
    check_text(&mut errors, "name", &req.name);
    check_text(&mut errors, "description", &req.description);
    check_text(&mut errors, "industry", &req.industry);
    check_text(&mut errors, "stage", &req.stage);
    check_founded_year(&mut errors, req.founded_year);
    errors.into_result()?;

    let startups = state.startups.clone();
    let startup = blocking(move || {
        if startups.startup_by_owner(user.id)?.is_some() {
            return Err(ApiError::conflict("You already have a startup profile"));
        }
        Ok(startups.create_startup(&NewStartup {
            user_id: user.id,
            name: req.name.trim().to_string(),
            description: req.description.trim().to_string(),
            industry: req.industry.trim().to_string(),
            stage: req.stage.trim().to_string(),
            website: normalize_website(req.website),
            founded_year: req.founded_year,
        })?)
    })
    .await?;

    info!("User {} created startup {}", startup.user_id, startup.id);
    Ok((StatusCode::CREATED, Json(startup)))
}

pub async fn my_startup(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Startup>, ApiError> {
    let startups = state.startups.clone();
    let startup = blocking(move || Ok(startups.startup_by_owner(user.id)?)).await?;
    startup.map(Json).ok_or(ApiError::not_found("Startup"))
}

pub async fn get_startup(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Startup>, ApiError> {
    authorize(None, Resource::StartupProfile, None, Action::Read)?;

    let startups = state.startups.clone();
    let startup = blocking(move || Ok(startups.startup_by_id(id)?)).await?;
    startup.map(Json).ok_or(ApiError::not_found("Startup"))
}

pub async fn update_startup(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStartupRequest>,
) -> Result<Json<Startup>, ApiError> {
    let mut errors = FieldErrors::default();
    for (field, value) in [
        ("name", &req.name),
        ("description", &req.description),
        ("industry", &req.industry),
        ("stage", &req.stage),
    ] {
        if let Some(value) = value {
            check_text(&mut errors, field, value);
        }
    }
    check_founded_year(&mut errors, req.founded_year);
    errors.into_result()?;

    let startups = state.startups.clone();
    let startup = blocking(move || {
        let existing = startups.startup_by_id(id)?.ok_or(ApiError::not_found("Startup"))?;
        authorize(Some(&user), Resource::StartupProfile, Some(existing.user_id), Action::Update)?;

        let changes = StartupChanges {
            name: req.name.map(|v| v.trim().to_string()),
            description: req.description.map(|v| v.trim().to_string()),
            industry: req.industry.map(|v| v.trim().to_string()),
            stage: req.stage.map(|v| v.trim().to_string()),
            website: normalize_website(req.website),
            founded_year: req.founded_year,
        };
        startups
            .update_startup(id, &changes)?
            .ok_or(ApiError::not_found("Startup"))
    })
    .await?;

    Ok(Json(startup))
}

pub async fn delete_startup(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let startups = state.startups.clone();
    blocking(move || {
        let existing = startups.startup_by_id(id)?.ok_or(ApiError::not_found("Startup"))?;
        authorize(Some(&user), Resource::StartupProfile, Some(existing.user_id), Action::Delete)?;
        match startups.delete_startup(id) {
            Ok(true) => {}
            Ok(false) => return Err(ApiError::not_found("Startup")),
            Err(DbError::ForeignKeyViolation { .. }) => {
                return Err(ApiError::conflict("A startup with applications cannot be deleted"));
            }
            Err(e) => return Err(e.into()),
        }
        info!("User {} deleted startup {}", user.id, id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Startup deleted successfully")))
}

pub async fn startup_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Application>>, ApiError> {
    let st = state.clone();
    let applications = blocking(move || st.workflow.list_for_startup(&user, id)).await?;
    Ok(Json(applications))
}
