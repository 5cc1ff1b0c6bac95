use crate::domain::{Book, BookId, Loan, LoanId, UserId};
use crate::ports::error::{Result, StoreError, constraints};
use crate::ports::lending_store::{LendingStore, LendingTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use super::store::{BookLocks, InMemoryStore, Tables, prune_book_lock};

#[async_trait]
impl LendingStore for InMemoryStore {
    async fn begin(&self, book_id: BookId) -> Result<Box<dyn LendingTransaction>> {
        let guard = self.book_lock(book_id).lock_owned().await;

        Ok(Box::new(InMemoryLendingTransaction {
            book_id,
            tables: Arc::clone(&self.tables),
            book_locks: Arc::clone(&self.book_locks),
            staged_loans: HashMap::new(),
            staged_available: None,
            guard: Some(guard),
        }))
    }
}

/// Lending transaction over the in-memory tables.
///
/// Holds the book's mutex until dropped. Writes are staged locally and
/// applied in one go on commit, so readers outside the transaction never see
/// a loan without its matching availability flag.
struct InMemoryLendingTransaction {
    book_id: BookId,
    tables: Arc<RwLock<Tables>>,
    book_locks: Arc<BookLocks>,
    /// New or closed loans, keyed by id. Shadow the committed rows.
    staged_loans: HashMap<LoanId, Loan>,
    staged_available: Option<bool>,
    /// Always `Some` until drop.
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InMemoryLendingTransaction {
    fn drop(&mut self) {
        self.guard.take();
        prune_book_lock(&self.book_locks, self.book_id);
    }
}

impl InMemoryLendingTransaction {
    /// The locked book's loans as this transaction sees them.
    fn visible_loans(&self) -> Vec<Loan> {
        let tables = self.tables.read();
        let mut loans: HashMap<LoanId, Loan> = tables
            .loans_for_book(self.book_id)
            .map(|l| (l.loan_id, l.clone()))
            .collect();
        loans.extend(
            self.staged_loans
                .iter()
                .map(|(id, loan)| (*id, loan.clone())),
        );
        loans.into_values().collect()
    }

    fn visible_open_loan(&self) -> Option<Loan> {
        self.visible_loans().into_iter().find(Loan::is_open)
    }
}

#[async_trait]
impl LendingTransaction for InMemoryLendingTransaction {
    fn book_id(&self) -> BookId {
        self.book_id
    }

    async fn book(&mut self) -> Result<Option<Book>> {
        let book = self.tables.read().books.get(&self.book_id).cloned();
        Ok(book.map(|mut b| {
            if let Some(available) = self.staged_available {
                b.available = available;
            }
            b
        }))
    }

    async fn find_open_loan(&mut self, user_id: UserId) -> Result<Option<Loan>> {
        Ok(self.visible_open_loan().filter(|l| l.user_id == user_id))
    }

    async fn find_open_loan_by_book(&mut self) -> Result<Option<Loan>> {
        Ok(self.visible_open_loan())
    }

    async fn get_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        if let Some(loan) = self.staged_loans.get(&loan_id) {
            return Ok(Some(loan.clone()));
        }
        Ok(self.tables.read().loans.get(&loan_id).cloned())
    }

    async fn create_loan(&mut self, loan: &Loan) -> Result<()> {
        if loan.book_id != self.book_id {
            return Err(StoreError::backend(format!(
                "loan for book {} created in transaction for book {}",
                loan.book_id, self.book_id
            )));
        }
        if self.visible_open_loan().is_some() {
            return Err(StoreError::Duplicate(
                constraints::ONE_OPEN_LOAN_PER_BOOK.to_string(),
            ));
        }
        self.staged_loans.insert(loan.loan_id, loan.clone());
        Ok(())
    }

    async fn close_loan(
        &mut self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Option<Loan>> {
        let loan = match self.get_loan(loan_id).await? {
            Some(loan) if loan.book_id == self.book_id && loan.is_open() => loan,
            _ => return Ok(None),
        };

        let closed = Loan {
            returned_at: Some(returned_at),
            ..loan
        };
        self.staged_loans.insert(loan_id, closed.clone());
        Ok(Some(closed))
    }

    async fn set_available(&mut self, available: bool) -> Result<bool> {
        if !self.tables.read().books.contains_key(&self.book_id) {
            return Ok(false);
        }
        self.staged_available = Some(available);
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        let mut tables = this.tables.write();

        if let Some(available) = this.staged_available {
            match tables.books.get_mut(&this.book_id) {
                Some(book) => book.available = available,
                None => {
                    return Err(StoreError::backend(format!(
                        "book {} disappeared during transaction",
                        this.book_id
                    )));
                }
            }
        }

        tables.loans.extend(this.staged_loans.drain());
        Ok(())
    }
}
