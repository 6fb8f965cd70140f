use sea_orm::{DbErr, SqlErr};
use validator::ValidationErrors;

/// Errors returned by the auth and catalog workflows.
///
/// The boundary layer maps each variant to a response; nothing in here knows
/// about status codes.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email already exists")]
    DuplicateEmail,

    #[error("conflict: {0}")]
    Conflict(String),

    /// Deliberately ambiguous between "no such account" and "wrong secret".
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("permission denied")]
    Forbidden,

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}

/// Errors produced by the persistence layer, independent of the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Db(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        if matches!(err, DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated) {
            return StoreError::NotFound;
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
            _ => StoreError::Db(err.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound("record".to_string()),
            StoreError::UniqueViolation(constraint) => {
                ServiceError::Conflict(format!("duplicate value violates {constraint}"))
            }
            StoreError::Db(message) => ServiceError::Internal(message),
        }
    }
}
