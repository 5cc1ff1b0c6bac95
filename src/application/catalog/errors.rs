use crate::domain::{AccessDenied, ErrorKind, ValidationError};
use crate::ports::StoreError;
use thiserror::Error;

/// Catalog application layer error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Book not found.")]
    NotFound,

    /// Page number past the last page
    #[error("Invalid page.")]
    InvalidPage,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{}", .0.message)]
    Validation(ValidationError),

    /// Loans are never deleted, so neither is a book that has any
    #[error("Book has loan history and cannot be deleted.")]
    HasLoanHistory,

    #[error("Storage error")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound | CatalogError::InvalidPage => ErrorKind::NotFound,
            CatalogError::Forbidden => ErrorKind::Forbidden,
            CatalogError::Validation(_) | CatalogError::HasLoanHistory => {
                ErrorKind::ValidationError
            }
            CatalogError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            CatalogError::Validation(err) => Some(err.field),
            _ => None,
        }
    }
}

impl From<ValidationError> for CatalogError {
    fn from(err: ValidationError) -> Self {
        CatalogError::Validation(err)
    }
}

impl From<AccessDenied> for CatalogError {
    fn from(_: AccessDenied) -> Self {
        CatalogError::Forbidden
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
