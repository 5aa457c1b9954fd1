use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation => {
                RepoError::InvalidInput {
                    message: db.message().to_string(),
                }
            }
            ErrorKind::CheckViolation => RepoError::Integrity {
                message: db.message().to_string(),
            },
            _ if db
                .message()
                .contains("canceling statement due to user request") =>
            {
                RepoError::Timeout
            }
            _ => RepoError::from_persistence(db),
        },
        other => RepoError::from_persistence(other),
    }
}

/// Stored references that no longer parse mean the row was written outside the service.
pub(super) fn corrupt_row(column: &'static str) -> impl Fn(DomainError) -> RepoError {
    move |err| RepoError::integrity(format!("column `{column}` holds an invalid value: {err}"))
}
