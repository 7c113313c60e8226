use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use launchpad_types::{
    api::{ApplicationQuery, ReviewRequest, SubmitApplicationRequest, UpdateStatusRequest},
    models::{Application, ApplicationDetail},
};

use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::session::CurrentUser;
use crate::state::{AppState, blocking};

pub async fn list_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<Application>>, ApiError> {
    let st = state.clone();
    let applications = blocking(move || st.workflow.list(&user, query.status)).await?;
    Ok(Json(applications))
}

pub async fn submit_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SubmitApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let application =
        blocking(move || st.workflow.submit(&user, req.startup_id, req.program_id, req.answers)).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn get_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationDetail>, ApiError> {
    let st = state.clone();
    let detail = blocking(move || st.workflow.get(&user, id)).await?;
    Ok(Json(detail))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Application>, ApiError> {
    let st = state.clone();
    let application =
        blocking(move || st.workflow.set_status(&user, id, req.status, req.feedback_note.as_deref())).await?;
    Ok(Json(application))
}

pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let review = blocking(move || st.workflow.review(&user, id, req.rating, &req.comment)).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
