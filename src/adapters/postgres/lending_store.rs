use crate::domain::{Book, BookId, Loan, LoanId, UserId};
use crate::ports::error::Result;
use crate::ports::lending_store::{LendingStore, LendingTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use super::error_mapping::map_sqlx_error;
use super::rows::{BOOK_COLUMNS, LOAN_COLUMNS, map_row_to_book, map_row_to_loan};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL implementation of [`LendingStore`].
///
/// Each transaction takes `SELECT ... FOR UPDATE` on the book row. Lock waits
/// are bounded by `lock_timeout`; an expired wait surfaces as a retryable
/// conflict.
pub struct PostgresLendingStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresLendingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[async_trait]
impl LendingStore for PostgresLendingStore {
    async fn begin(&self, book_id: BookId) -> Result<Box<dyn LendingTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE"
        ))
        .bind(book_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let book = row.as_ref().map(map_row_to_book).transpose()?;

        Ok(Box::new(PostgresLendingTransaction { tx, book_id, book }))
    }
}

/// Open database transaction holding the row lock on one book.
///
/// Dropping it without commit rolls back.
struct PostgresLendingTransaction {
    tx: Transaction<'static, Postgres>,
    book_id: BookId,
    /// Locked row as read at begin, kept in step with `set_available`.
    book: Option<Book>,
}

#[async_trait]
impl LendingTransaction for PostgresLendingTransaction {
    fn book_id(&self) -> BookId {
        self.book_id
    }

    async fn book(&mut self) -> Result<Option<Book>> {
        Ok(self.book.clone())
    }

    async fn find_open_loan(&mut self, user_id: UserId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE book_id = $1 AND user_id = $2 AND returned_at IS NULL
            "#
        ))
        .bind(self.book_id.value())
        .bind(user_id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn find_open_loan_by_book(&mut self) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE book_id = $1 AND returned_at IS NULL"
        ))
        .bind(self.book_id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn get_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"))
            .bind(loan_id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn create_loan(&mut self, loan: &Loan) -> Result<()> {
        // A second open loan trips loans_one_open_per_book and maps to Duplicate.
        sqlx::query(
            r#"
            INSERT INTO loans (id, book_id, user_id, borrowed_at, returned_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(loan.user_id.value())
        .bind(loan.borrowed_at)
        .bind(loan.returned_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn close_loan(
        &mut self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE loans
            SET returned_at = $3
            WHERE id = $1 AND book_id = $2 AND returned_at IS NULL
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(loan_id.value())
        .bind(self.book_id.value())
        .bind(returned_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn set_available(&mut self, available: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE books SET available = $2 WHERE id = $1")
            .bind(self.book_id.value())
            .bind(available)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(book) = self.book.as_mut() {
            book.available = available;
        }
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
