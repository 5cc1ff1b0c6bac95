use crate::domain::{self, CallerContext, Loan, commands::*};
use crate::ports::{StoreError, constraints};
use chrono::Utc;
use std::future::Future;
use std::time::Duration;

use super::errors::{LoanApplicationError, Result};
use crate::application::ServiceDependencies;

/// Attempts per lending transaction before a transient conflict surfaces.
pub(crate) const MAX_TX_ATTEMPTS: u32 = 3;

const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Run `attempt` again while it fails with a transient storage conflict.
///
/// Backoff grows linearly with the attempt number. Lifecycle errors are
/// returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt_no = 1;
    loop {
        match attempt().await {
            Err(LoanApplicationError::Store(err))
                if err.is_transient() && attempt_no < MAX_TX_ATTEMPTS =>
            {
                tracing::warn!(
                    operation,
                    attempt = attempt_no,
                    error = %err,
                    "transient storage conflict, retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt_no).await;
                attempt_no += 1;
            }
            result => return result,
        }
    }
}

/// Lend a book to the caller.
///
/// Business rules:
/// - the book must exist
/// - the caller must not already hold an open loan for it
/// - no one else may hold it, and its availability flag must be set
///
/// Runs inside a lending transaction locked on the book, so the new loan and
/// `available = false` are written together. Of N concurrent borrows of one
/// available book exactly one succeeds.
pub async fn borrow_book(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    cmd: BorrowBook,
) -> Result<Loan> {
    let loan = with_retry("borrow", || try_borrow(deps, caller, cmd)).await?;

    tracing::info!(
        loan_id = %loan.loan_id,
        book_id = %loan.book_id,
        user_id = %loan.user_id,
        "book borrowed"
    );
    Ok(loan)
}

async fn try_borrow(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    cmd: BorrowBook,
) -> Result<Loan> {
    let mut tx = deps.lending.begin(cmd.book_id).await?;

    let book = tx.book().await?.ok_or(LoanApplicationError::BookNotFound)?;
    let own_open_loan = tx.find_open_loan(caller.user_id).await?;
    let holder = tx.find_open_loan_by_book().await?;

    let loan = domain::loan::borrow_book(
        &book,
        caller.user_id,
        own_open_loan.as_ref(),
        holder.as_ref(),
        Utc::now(),
    )?;

    tx.create_loan(&loan).await.map_err(|err| match err {
        StoreError::Duplicate(ref c) if c == constraints::ONE_OPEN_LOAN_PER_BOOK => {
            LoanApplicationError::BookUnavailable
        }
        other => other.into(),
    })?;
    tx.set_available(false).await?;
    tx.commit().await?;

    Ok(loan)
}

/// Close one of the caller's loans.
///
/// Business rules:
/// - the loan must exist, be open, and belong to the caller
/// - `returned_at` is the server clock
///
/// The loan is closed and the book marked available in one lending
/// transaction. A second return of the same loan fails with `NoActiveLoan`.
pub async fn return_book(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    cmd: ReturnBook,
) -> Result<Loan> {
    // The book a loan points at never changes, so an unlocked read is enough
    // to find which lock to take.
    let book_id = deps
        .ledger
        .get_by_id(cmd.loan_id)
        .await?
        .ok_or(LoanApplicationError::NoActiveLoan)?
        .book_id;

    let loan = with_retry("return", || async move {
        let mut tx = deps.lending.begin(book_id).await?;

        let current = tx
            .get_loan(cmd.loan_id)
            .await?
            .ok_or(LoanApplicationError::NoActiveLoan)?;
        let returned = domain::loan::return_book(&current, caller.user_id, Utc::now())?;

        let returned_at = returned.returned_at.unwrap_or(current.borrowed_at);
        let closed = tx
            .close_loan(cmd.loan_id, returned_at)
            .await?
            .ok_or(LoanApplicationError::NoActiveLoan)?;

        if !tx.set_available(true).await? {
            return Err(LoanApplicationError::BookNotFound);
        }
        tx.commit().await?;

        Ok(closed)
    })
    .await?;

    tracing::info!(
        loan_id = %loan.loan_id,
        book_id = %loan.book_id,
        user_id = %loan.user_id,
        "book returned"
    );
    Ok(loan)
}

/// Every loan of the caller, open and closed, newest first.
pub async fn list_loans(deps: &ServiceDependencies, caller: &CallerContext) -> Result<Vec<Loan>> {
    Ok(deps.ledger.list_by_user(caller.user_id).await?)
}
