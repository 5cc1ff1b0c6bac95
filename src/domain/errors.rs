use std::fmt;
use thiserror::Error;

/// Machine-readable failure kind reported across the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    BookUnavailable,
    AlreadyBorrowed,
    NoActiveLoan,
    Forbidden,
    Unauthenticated,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::BookUnavailable => "BOOK_UNAVAILABLE",
            ErrorKind::AlreadyBorrowed => "ALREADY_BORROWED",
            ErrorKind::NoActiveLoan => "NO_ACTIVE_LOAN",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrow rejected by the lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowError {
    /// Someone else holds the book, or the catalog marks it as lent out.
    BookUnavailable,
    /// The caller already holds an open loan for this book.
    AlreadyBorrowed,
}

/// Return rejected by the lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnError {
    /// The loan is closed, or it is not held by the caller.
    NoActiveLoan,
}

/// Input rejected by a field rule (registration, catalog entries).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
