use crate::domain::{Book, BookId, Loan, LoanId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::Result;

/// Opens lending transactions.
///
/// A lending transaction holds an exclusive lock on one book for its whole
/// lifetime, so two borrows or returns of the same book never interleave.
/// Operations on different books proceed in parallel.
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Begin a transaction locked on `book_id`.
    ///
    /// Waits for any other transaction on the same book to finish. A lock
    /// wait that times out surfaces as [`StoreError::Conflict`](super::StoreError::Conflict).
    async fn begin(&self, book_id: BookId) -> Result<Box<dyn LendingTransaction>>;
}

/// Unit of work over one book's catalog row and its ledger entries.
///
/// Writes become visible to other readers only on [`commit`](Self::commit),
/// all together. Dropping the transaction without committing discards them.
#[async_trait]
pub trait LendingTransaction: Send {
    /// The locked book.
    fn book_id(&self) -> BookId;

    /// Current state of the locked book, `None` if it does not exist.
    async fn book(&mut self) -> Result<Option<Book>>;

    /// The open loan of `user_id` for the locked book.
    async fn find_open_loan(&mut self, user_id: UserId) -> Result<Option<Loan>>;

    /// The open loan for the locked book, whoever holds it.
    async fn find_open_loan_by_book(&mut self) -> Result<Option<Loan>>;

    /// A loan by id, as seen inside this transaction.
    async fn get_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// Append a new open loan for the locked book.
    ///
    /// Fails with `Duplicate` if the book already has an open loan.
    async fn create_loan(&mut self, loan: &Loan) -> Result<()>;

    /// Set `returned_at` on an open loan of the locked book.
    ///
    /// Returns `None` when no such open loan exists, including when it was
    /// already closed. Closing twice is never a silent success.
    async fn close_loan(
        &mut self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Option<Loan>>;

    /// Write the availability flag of the locked book.
    ///
    /// Returns false if the book does not exist.
    async fn set_available(&mut self, available: bool) -> Result<bool>;

    /// Make every write of this transaction visible at once.
    async fn commit(self: Box<Self>) -> Result<()>;
}
