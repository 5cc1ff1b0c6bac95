use crate::domain::{BookId, Loan, LoanId, UserId};
use crate::ports::error::Result;
use crate::ports::loan_ledger::LoanLedger;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::error_mapping::map_sqlx_error;
use super::rows::{LOAN_COLUMNS, map_row_to_loan};

/// PostgreSQL implementation of [`LoanLedger`].
///
/// Plain pool reads. Writes to `loans` only happen in
/// [`PostgresLendingStore`](super::PostgresLendingStore) transactions.
pub struct PostgresLoanLedger {
    pool: PgPool,
}

impl PostgresLoanLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanLedger for PostgresLoanLedger {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"))
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn find_open_loan(&self, user_id: UserId, book_id: BookId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            "#
        ))
        .bind(user_id.value())
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// Served by the `loans_one_open_per_book` partial index.
    async fn find_open_loan_by_book(&self, book_id: BookId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE book_id = $1 AND returned_at IS NULL"
        ))
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE user_id = $1
            ORDER BY borrowed_at DESC, id ASC
            "#
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn has_loans_for_book(&self, book_id: BookId) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = $1) AS referenced")
            .bind(book_id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_get("referenced").map_err(map_sqlx_error)
    }
}
