use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use launchpad_auth::{password::PasswordError, token::TokenError};
use launchpad_db::DbError;

pub const FORBIDDEN_MESSAGE: &str = "You don't have permission to perform this action";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable session.
    #[error("Authentication required")]
    Unauthorized,

    /// Login failure. Unknown email, wrong password and deactivated account
    /// all look the same.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Reset token that is malformed, expired, for another purpose or
    /// already spent.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(resource: &'static str) -> Self {
        ApiError::NotFound { resource }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
        }
    }

    /// Validation failure on a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Validation {
            fields: BTreeMap::from([(field.to_string(), message.clone())]),
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Validation { .. } | ApiError::InvalidRole(_) | ApiError::InvalidToken => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Database(DbError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            ApiError::Database(DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Store and internal failures never leak
    /// their cause.
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(DbError::UniqueViolation { table, .. }) => match table.as_deref() {
                Some("users") => "An account with this email address already exists".to_string(),
                Some("startups") => "You already have a startup profile".to_string(),
                Some("applications") => "This startup has already applied to this program".to_string(),
                Some("application_reviews") => "You have already reviewed this application".to_string(),
                _ => "Resource already exists".to_string(),
            },
            ApiError::Database(DbError::ForeignKeyViolation { .. }) => {
                "Invalid reference to a related resource".to_string()
            }
            ApiError::Database(DbError::CheckViolation { .. }) => "Invalid data provided".to_string(),
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => ApiError::InvalidToken,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid("path", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid("query", rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Database(DbError::UniqueViolation { .. }) => warn!("Conflict: {}", self),
            ApiError::Database(_) | ApiError::Internal(_) => error!("Request failed: {:#}", self),
            _ => {}
        }

        let details = match &self {
            ApiError::Validation { fields, .. } if !fields.is_empty() => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.public_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Collects per-field validation failures for one request.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.0.entry(field.into()).or_insert_with(|| message.into());
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.check(false, field, message);
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(ApiError::Validation {
            message: "Invalid input".to_string(),
            fields: self.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_conflict_with_table_message() {
        let err = ApiError::Database(DbError::UniqueViolation {
            table: Some("applications".into()),
            message: "UNIQUE constraint failed: applications.startup_id".into(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "This startup has already applied to this program");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");

        let err = ApiError::Database(DbError::Poisoned);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn token_errors_split_between_client_and_server() {
        assert!(matches!(ApiError::from(TokenError::InvalidToken), ApiError::InvalidToken));
        assert!(matches!(ApiError::from(TokenError::MissingSecret), ApiError::Internal(_)));
    }

    #[test]
    fn field_errors_keep_first_message_per_field() {
        let mut errors = FieldErrors::default();
        errors.check(true, "email", "never");
        errors.check(false, "password", "too short");
        errors.push("password", "second");
        match errors.into_result() {
            Err(ApiError::Validation { fields, .. }) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields["password"], "too short");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::default().into_result().is_ok());
    }
}
