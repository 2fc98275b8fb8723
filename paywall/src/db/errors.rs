//! Storage errors.
//!
//! Repositories return [`DbError`] rather than raw `sqlx::Error`, so handlers can turn constraint
//! failures (a duplicate account email, a bookmark pointing at a deleted strategy, a win rate
//! outside 0..=100) into client errors while everything else stays a 500.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// No row matched the identifier
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// A `CHECK` in the schema rejected the row, e.g. `strategies_win_rate_range`
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return match err {
                sqlx::Error::RowNotFound => DbError::NotFound,
                // Pool timeouts, IO and protocol errors
                other => DbError::Other(anyhow::Error::from(other)),
            };
        };

        let constraint = db_err.constraint().map(str::to_string);
        let table = db_err.table().map(str::to_string);
        let message = db_err.message().to_string();

        match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => DbError::UniqueViolation { constraint, table, message },
            sqlx::error::ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { constraint, table, message },
            sqlx::error::ErrorKind::CheckViolation => DbError::CheckViolation { constraint, table, message },
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
