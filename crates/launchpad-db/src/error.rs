use rusqlite::ErrorCode;
use rusqlite::ffi;

/// Database errors application code can act on. Constraint failures are
/// classified so uniqueness violations can surface as conflicts.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("unique constraint violation: {message}")]
    UniqueViolation {
        table: Option<String>,
        message: String,
    },

    #[error("foreign key constraint violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("check constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("corrupt {entity} row '{id}': {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    pub(crate) fn corrupt(entity: &'static str, id: &str, reason: impl ToString) -> Self {
        DbError::Corrupt {
            entity,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(inner, message) = &err {
            if inner.code == ErrorCode::ConstraintViolation {
                let message = message.clone().unwrap_or_else(|| inner.to_string());
                return match inner.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => DbError::UniqueViolation {
                        table: constrained_table(&message),
                        message,
                    },
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => DbError::ForeignKeyViolation { message },
                    ffi::SQLITE_CONSTRAINT_CHECK => DbError::CheckViolation { message },
                    _ => DbError::Sqlite(err),
                };
            }
        }
        DbError::Sqlite(err)
    }
}

/// "UNIQUE constraint failed: applications.startup_id, ..." -> "applications"
fn constrained_table(message: &str) -> Option<String> {
    let (_, columns) = message.split_once(": ")?;
    let (table, _) = columns.split_once('.')?;
    Some(table.trim().to_string())
}
