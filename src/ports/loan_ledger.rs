use crate::domain::{BookId, Loan, LoanId, UserId};
use async_trait::async_trait;

use super::error::Result;

/// Loan ledger port, read side.
///
/// The ledger is append-only. Loans are created and closed only inside a
/// [`LendingTransaction`](super::LendingTransaction); these lookups run
/// outside any lock and may be stale by the time the caller acts on them.
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// Get a single loan by id.
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// The open loan for this (user, book) pair, if any.
    async fn find_open_loan(&self, user_id: UserId, book_id: BookId) -> Result<Option<Loan>>;

    /// The current holder of a book, if any.
    async fn find_open_loan_by_book(&self, book_id: BookId) -> Result<Option<Loan>>;

    /// Every loan for a user, open and closed.
    ///
    /// Ordered by `borrowed_at` descending, then loan id, so paging is stable.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Loan>>;

    /// Whether any loan, open or closed, references the book.
    async fn has_loans_for_book(&self, book_id: BookId) -> Result<bool>;
}
