use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::RunError as BB8RunError;
use thiserror::Error;

/// Failure kinds every repository operation reports.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no changes requested")]
    NoChangesRequested,

    #[error("database error: {0}")]
    Database(#[source] DieselError),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _
            ))
        )
    }

    /// Name of the violated foreign key constraint, e.g. `time_entries_task_id_fkey`.
    pub fn violated_foreign_key(&self) -> Option<&str> {
        match self {
            StorageError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => info.constraint_name(),
            _ => None,
        }
    }
}

impl From<DieselError> for StorageError {
    fn from(error: DieselError) -> StorageError {
        match error {
            DieselError::NotFound => {
                StorageError::NotFound("the requested record was not found".to_string())
            }
            DieselError::DatabaseError(
                kind @ (DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation),
                info,
            ) => {
                log::warn!("Store rejected value ({:?}): {}", kind, info.message());
                StorageError::InvalidInput(info.message().to_string())
            }
            // SQLSTATE 57014 raised by the `statement_timeout` set from the request deadline.
            DieselError::DatabaseError(DatabaseErrorKind::Unknown, ref info)
                if info.message().contains("statement timeout") =>
            {
                log::warn!("Store cancelled statement at deadline: {}", info.message());
                StorageError::DeadlineExceeded
            }
            // Postgres reports domain overflows (SQLSTATE 22003) without a dedicated kind.
            DieselError::DatabaseError(DatabaseErrorKind::Unknown, ref info)
                if info.message().contains("out of range") =>
            {
                log::warn!("Store rejected out of range value: {}", info.message());
                StorageError::InvalidInput(info.message().to_string())
            }
            err => {
                log::error!("Unexpected Diesel error: {}", err);
                StorageError::Database(err)
            }
        }
    }
}

impl From<BB8RunError> for StorageError {
    fn from(error: BB8RunError) -> StorageError {
        log::error!("BB8 connection pool error: {:?}", error);
        StorageError::Pool(error.to_string())
    }
}
