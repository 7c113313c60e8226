use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use launchpad_auth::policy::{Action, Resource};
use launchpad_db::{NewComment, NewPost};
use launchpad_types::{
    api::{CreateCommentRequest, CreatePostRequest, MessageResponse, UpdatePostRequest},
    models::{ForumComment, ForumPost},
};

use crate::access::authorize;
use crate::error::{ApiError, FieldErrors};
use crate::extract::{Json, Path};
use crate::session::CurrentUser;
use crate::state::{AppState, blocking};

pub const MAX_TITLE_LEN: usize = 200;

fn check_post(errors: &mut FieldErrors, title: Option<&str>, content: Option<&str>) {
    if let Some(title) = title {
        let len = title.trim().chars().count();
        errors.check(
            len > 0 && len <= MAX_TITLE_LEN,
            "title",
            format!("Title must be between 1 and {MAX_TITLE_LEN} characters"),
        );
    }
    if let Some(content) = content {
        errors.check(!content.trim().is_empty(), "content", "Content must not be empty");
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(Some(&user), Resource::ForumPost, Some(user.id), Action::Create)?;

    let mut errors = FieldErrors::default();
    check_post(&mut errors, Some(&req.title), Some(&req.content));
    errors.into_result()?;

    let posts = state.posts.clone();
    let post = blocking(move || {
        Ok(posts.create_post(&NewPost {
            author_id: user.id,
            title: req.title.trim().to_string(),
            content: req.content.trim().to_string(),
        })?)
    })
    .await?;

    info!("User {} created post {}", post.author_id, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ForumPost>, ApiError> {
    authorize(None, Resource::ForumPost, None, Action::Read)?;

    let posts = state.posts.clone();
    let post = blocking(move || Ok(posts.post_by_id(id)?)).await?;
    post.map(Json).ok_or(ApiError::not_found("Post"))
}

pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<ForumPost>, ApiError> {
    let mut errors = FieldErrors::default();
    check_post(&mut errors, req.title.as_deref(), req.content.as_deref());
    errors.into_result()?;

    let posts = state.posts.clone();
    let post = blocking(move || {
        let existing = posts.post_by_id(id)?.ok_or(ApiError::not_found("Post"))?;
        authorize(Some(&user), Resource::ForumPost, Some(existing.author_id), Action::Update)?;
        posts
            .update_post(id, req.title.as_deref().map(str::trim), req.content.as_deref().map(str::trim))?
            .ok_or(ApiError::not_found("Post"))
    })
    .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let posts = state.posts.clone();
    blocking(move || {
        let existing = posts.post_by_id(id)?.ok_or(ApiError::not_found("Post"))?;
        authorize(Some(&user), Resource::ForumPost, Some(existing.author_id), Action::Delete)?;
        if !posts.delete_post(id)? {
            return Err(ApiError::not_found("Post"));
        }
        info!("User {} deleted post {}", user.id, id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// Any signed-in user may comment on an existing post.
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(Some(&user), Resource::ForumPost, Some(user.id), Action::Create)?;

    let posts = state.posts.clone();
    let comment = blocking(move || {
        if posts.post_by_id(post_id)?.is_none() {
            return Err(ApiError::not_found("Post"));
        }
        let content = req.content.trim();
        if content.is_empty() {
            return Err(ApiError::invalid("content", "Content is required"));
        }
        Ok(posts.create_comment(&NewComment {
            post_id,
            author_id: user.id,
            content: content.to_string(),
        })?)
    })
    .await?;

    info!("User {} commented on post {}", comment.author_id, comment.post_id);
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<ForumComment>>, ApiError> {
    authorize(None, Resource::ForumPost, None, Action::Read)?;

    let posts = state.posts.clone();
    let comments = blocking(move || {
        if posts.post_by_id(post_id)?.is_none() {
            return Err(ApiError::not_found("Post"));
        }
        Ok(posts.comments_for(post_id)?)
    })
    .await?;
    Ok(Json(comments))
}
