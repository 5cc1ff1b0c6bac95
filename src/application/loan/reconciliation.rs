use crate::domain::{self, BookId};
use futures::stream::{self, StreamExt, TryStreamExt};

use super::errors::Result;
use super::loan_service::with_retry;
use crate::application::ServiceDependencies;

/// Books checked at the same time. Each check holds one book's lock.
const RECONCILE_CONCURRENCY: usize = 4;

/// Repair availability flags that drifted from the ledger.
///
/// Each book is checked inside its own lending transaction, so a repair
/// never races a borrow or return of the same book. Returns the number of
/// books whose flag was rewritten.
pub async fn reconcile_availability(deps: &ServiceDependencies) -> Result<usize> {
    let book_ids = deps.catalog.all_ids().await?;

    let repaired = stream::iter(book_ids)
        .map(move |book_id| with_retry("reconcile", move || reconcile_book(deps, book_id)))
        .buffer_unordered(RECONCILE_CONCURRENCY)
        .try_fold(0, |count, fixed| async move { Ok(count + usize::from(fixed)) })
        .await?;

    tracing::debug!(repaired, "availability reconciliation finished");
    Ok(repaired)
}

async fn reconcile_book(deps: &ServiceDependencies, book_id: BookId) -> Result<bool> {
    let mut tx = deps.lending.begin(book_id).await?;

    // Deleted since all_ids ran.
    let Some(book) = tx.book().await? else {
        return Ok(false);
    };

    let holder = tx.find_open_loan_by_book().await?;
    let expected = domain::loan::expected_availability(holder.as_ref());
    if book.available == expected {
        return Ok(false);
    }

    tx.set_available(expected).await?;
    tx.commit().await?;

    tracing::warn!(
        book_id = %book_id,
        flag = book.available,
        ledger = expected,
        "repaired availability drift"
    );
    Ok(true)
}
