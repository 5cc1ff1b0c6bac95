use crate::domain::{ErrorKind, ValidationError};
use crate::ports::{AuthError, StoreError};
use thiserror::Error;

/// Account application layer error.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{}", .0.message)]
    Validation(ValidationError),

    /// Unknown email, wrong password, or inactive account. Deliberately
    /// indistinguishable.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Token is invalid or expired.")]
    InvalidToken,

    #[error("Credential backend error")]
    Credentials(#[source] AuthError),

    #[error("Storage error")]
    Store(#[from] StoreError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::Validation(_) | AccountError::InvalidCredentials => {
                ErrorKind::ValidationError
            }
            AccountError::InvalidToken => ErrorKind::Unauthenticated,
            AccountError::Credentials(_) | AccountError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            AccountError::Validation(err) => Some(err.field),
            _ => None,
        }
    }
}

impl From<ValidationError> for AccountError {
    fn from(err: ValidationError) -> Self {
        AccountError::Validation(err)
    }
}

impl From<AuthError> for AccountError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => AccountError::InvalidToken,
            other => AccountError::Credentials(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
