use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage failure reported by any store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock wait timed out, deadlock, or serialization failure. Safe to retry.
    #[error("storage conflict")]
    Conflict(#[source] BoxError),

    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    /// A delete was refused because other records still reference the row.
    #[error("row is still referenced: {0}")]
    Referenced(String),

    /// Anything else the backend reported.
    #[error("storage backend error")]
    Backend(#[source] BoxError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn backend(err: impl Into<BoxError>) -> Self {
        StoreError::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Constraint names shared by every adapter.
pub mod constraints {
    pub const BOOK_ISBN_UNIQUE: &str = "books_isbn_key";
    pub const USER_EMAIL_UNIQUE: &str = "users_email_key";
    pub const ONE_OPEN_LOAN_PER_BOOK: &str = "loans_one_open_per_book";
    pub const LOAN_BOOK_REFERENCE: &str = "loans_book_id_fkey";
}
