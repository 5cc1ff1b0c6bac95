use crate::domain::{BorrowError, ErrorKind, ReturnError};
use crate::ports::StoreError;
use thiserror::Error;

/// Lending application layer error.
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// The book does not exist
    #[error("Book not found.")]
    BookNotFound,

    /// Someone holds the book, or the catalog marks it as lent out
    #[error("Book is not available.")]
    BookUnavailable,

    /// The caller already holds an open loan for this book
    #[error("You have already borrowed this book.")]
    AlreadyBorrowed,

    /// The loan is missing, closed, or held by someone else
    #[error("You have not borrowed this book or it has already been returned.")]
    NoActiveLoan,

    /// Storage failure, including conflicts that outlived the retries
    #[error("Storage error")]
    Store(#[from] StoreError),
}

impl LoanApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanApplicationError::BookNotFound => ErrorKind::NotFound,
            LoanApplicationError::BookUnavailable => ErrorKind::BookUnavailable,
            LoanApplicationError::AlreadyBorrowed => ErrorKind::AlreadyBorrowed,
            LoanApplicationError::NoActiveLoan => ErrorKind::NoActiveLoan,
            LoanApplicationError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<BorrowError> for LoanApplicationError {
    fn from(err: BorrowError) -> Self {
        match err {
            BorrowError::BookUnavailable => LoanApplicationError::BookUnavailable,
            BorrowError::AlreadyBorrowed => LoanApplicationError::AlreadyBorrowed,
        }
    }
}

impl From<ReturnError> for LoanApplicationError {
    fn from(err: ReturnError) -> Self {
        match err {
            ReturnError::NoActiveLoan => LoanApplicationError::NoActiveLoan,
        }
    }
}

/// Lending application layer result.
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
