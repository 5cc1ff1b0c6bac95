use crate::ports::error::StoreError;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Classify a sqlx error by SQLSTATE.
///
/// Lock and serialization conflicts become `Conflict` so the lending service
/// can retry them; constraint violations keep their constraint name.
pub(super) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let (code, constraint) = match &err {
        sqlx::Error::Database(db_err) => (
            db_err.code().map(|c| c.into_owned()),
            db_err.constraint().map(str::to_owned),
        ),
        _ => (None, None),
    };

    match code.as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
            StoreError::Conflict(Box::new(err))
        }
        Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(constraint.unwrap_or_else(|| "unique".to_string()))
        }
        Some(FOREIGN_KEY_VIOLATION) => {
            StoreError::Referenced(constraint.unwrap_or_else(|| "foreign_key".to_string()))
        }
        _ => StoreError::Backend(Box::new(err)),
    }
}

/// A stored value that no longer passes domain validation.
pub(super) fn invalid_data(message: String) -> StoreError {
    StoreError::backend(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}
