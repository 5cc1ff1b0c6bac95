use async_trait::async_trait;
use library_lending::adapters::memory::InMemoryStore;
use library_lending::application::loan::{
    LoanApplicationError, borrow_book, list_loans, reconcile_availability, return_book,
};
use library_lending::domain::commands::*;
use library_lending::domain::{BookId, CallerContext, LoanStatus, UserId};
use library_lending::ports::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

mod common;

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_borrow_marks_book_unavailable() {
    let (deps, _store) = common::memory_deps();
    let book = common::seed_book(&deps, "Django Advanced", common::ISBNS[0]).await;
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    let loan = borrow_book(&deps, &reader, BorrowBook { book_id: book.book_id })
        .await
        .unwrap();

    assert_eq!(loan.book_id, book.book_id);
    assert_eq!(loan.user_id, reader.user_id);
    assert_eq!(loan.status(), LoanStatus::Open);

    let stored = deps.catalog.get_by_id(book.book_id).await.unwrap().unwrap();
    assert!(!stored.available);
    let holder = deps.ledger.find_open_loan_by_book(book.book_id).await.unwrap();
    assert_eq!(holder, Some(loan));
}

#[tokio::test]
async fn test_full_lending_scenario() {
    let (deps, _store) = common::memory_deps();
    let book = common::seed_book(&deps, "Django Advanced", common::ISBNS[0]).await;
    let reader = common::seed_user(&deps, "reader@example.com", false).await;
    let cmd = BorrowBook { book_id: book.book_id };

    // Borrow
    let loan = borrow_book(&deps, &reader, cmd).await.unwrap();

    // Borrowing again while holding it
    let err = borrow_book(&deps, &reader, cmd).await.unwrap_err();
    assert!(matches!(err, LoanApplicationError::AlreadyBorrowed));

    // Return
    let returned = return_book(&deps, &reader, ReturnBook { loan_id: loan.loan_id })
        .await
        .unwrap();
    assert_eq!(returned.status(), LoanStatus::Closed);
    assert!(returned.returned_at.unwrap() >= returned.borrowed_at);
    assert!(deps.catalog.get_by_id(book.book_id).await.unwrap().unwrap().available);

    // Second return of the same loan
    let err = return_book(&deps, &reader, ReturnBook { loan_id: loan.loan_id })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::NoActiveLoan));
}

#[tokio::test]
async fn test_borrow_return_borrow_across_users() {
    let (deps, _store) = common::memory_deps();
    let book = common::seed_book(&deps, "Django Advanced", common::ISBNS[0]).await;
    let alice = common::seed_user(&deps, "alice@example.com", false).await;
    let bob = common::seed_user(&deps, "bob@example.com", false).await;
    let cmd = BorrowBook { book_id: book.book_id };

    let first = borrow_book(&deps, &alice, cmd).await.unwrap();

    let err = borrow_book(&deps, &bob, cmd).await.unwrap_err();
    assert!(matches!(err, LoanApplicationError::BookUnavailable));

    return_book(&deps, &alice, ReturnBook { loan_id: first.loan_id })
        .await
        .unwrap();

    let second = borrow_book(&deps, &bob, cmd).await.unwrap();
    assert_ne!(second.loan_id, first.loan_id);
    assert_eq!(second.user_id, bob.user_id);

    // Closed loans stay in the ledger.
    let history = deps.ledger.get_by_id(first.loan_id).await.unwrap().unwrap();
    assert_eq!(history.status(), LoanStatus::Closed);
}

#[tokio::test]
async fn test_borrow_unknown_book_is_not_found() {
    let (deps, _store) = common::memory_deps();
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    let err = borrow_book(&deps, &reader, BorrowBook { book_id: BookId::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::BookNotFound));
}

#[tokio::test]
async fn test_return_by_other_user_is_rejected() {
    let (deps, _store) = common::memory_deps();
    let book = common::seed_book(&deps, "Django Advanced", common::ISBNS[0]).await;
    let alice = common::seed_user(&deps, "alice@example.com", false).await;
    let bob = common::seed_user(&deps, "bob@example.com", false).await;

    let loan = borrow_book(&deps, &alice, BorrowBook { book_id: book.book_id })
        .await
        .unwrap();

    let err = return_book(&deps, &bob, ReturnBook { loan_id: loan.loan_id })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::NoActiveLoan));

    // Still held by alice.
    assert!(!deps.catalog.get_by_id(book.book_id).await.unwrap().unwrap().available);
}

#[tokio::test]
async fn test_return_unknown_loan_is_rejected() {
    let (deps, _store) = common::memory_deps();
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    let err = return_book(&deps, &reader, ReturnBook { loan_id: Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::NoActiveLoan));
}

#[tokio::test]
async fn test_list_loans_newest_first_and_own_only() {
    let (deps, _store) = common::memory_deps();
    let first_book = common::seed_book(&deps, "First", common::ISBNS[0]).await;
    let second_book = common::seed_book(&deps, "Second", common::ISBNS[1]).await;
    let reader = common::seed_user(&deps, "reader@example.com", false).await;
    let other = common::seed_user(&deps, "other@example.com", false).await;

    let first = borrow_book(&deps, &reader, BorrowBook { book_id: first_book.book_id })
        .await
        .unwrap();
    return_book(&deps, &reader, ReturnBook { loan_id: first.loan_id })
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = borrow_book(&deps, &reader, BorrowBook { book_id: second_book.book_id })
        .await
        .unwrap();
    borrow_book(&deps, &other, BorrowBook { book_id: first_book.book_id })
        .await
        .unwrap();

    let loans = list_loans(&deps, &reader).await.unwrap();
    let ids: Vec<_> = loans.iter().map(|l| l.loan_id).collect();
    assert_eq!(ids, vec![second.loan_id, first.loan_id]);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_exactly_one_succeeds() {
    const READERS: usize = 16;

    let (deps, _store) = common::memory_deps();
    let book = common::seed_book(&deps, "Popular Book", common::ISBNS[0]).await;

    let mut readers = Vec::with_capacity(READERS);
    for i in 0..READERS {
        readers.push(common::seed_user(&deps, &format!("reader{i}@example.com"), false).await);
    }

    let book_id = book.book_id;
    let handles: Vec<_> = readers
        .into_iter()
        .map(|reader| {
            let deps = deps.clone();
            tokio::spawn(async move { borrow_book(&deps, &reader, BorrowBook { book_id }).await })
        })
        .collect();

    let mut successes = 0;
    let mut unavailable = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LoanApplicationError::BookUnavailable) => unavailable += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(unavailable, READERS - 1);
    assert!(!deps.catalog.get_by_id(book_id).await.unwrap().unwrap().available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_different_books_all_succeed() {
    let (deps, _store) = common::memory_deps();
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    let mut books = Vec::new();
    for (i, isbn) in common::ISBNS.iter().enumerate() {
        books.push(common::seed_book(&deps, &format!("Book {i}"), isbn).await);
    }

    let handles: Vec<_> = books
        .iter()
        .map(|book| {
            let deps = deps.clone();
            let book_id = book.book_id;
            tokio::spawn(async move { borrow_book(&deps, &reader, BorrowBook { book_id }).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(list_loans(&deps, &reader).await.unwrap().len(), common::ISBNS.len());
}

// ============================================================================
// Drift and reconciliation
// ============================================================================

#[tokio::test]
async fn test_ledger_wins_over_drifted_flag() {
    let (deps, store) = common::memory_deps();
    let book = common::seed_book(&deps, "Drifted", common::ISBNS[0]).await;
    let alice = common::seed_user(&deps, "alice@example.com", false).await;
    let bob = common::seed_user(&deps, "bob@example.com", false).await;

    borrow_book(&deps, &alice, BorrowBook { book_id: book.book_id })
        .await
        .unwrap();
    // Flag says available although alice still holds the book.
    assert!(store.force_availability(book.book_id, true));

    let err = borrow_book(&deps, &bob, BorrowBook { book_id: book.book_id })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::BookUnavailable));
}

#[tokio::test]
async fn test_reconcile_repairs_drift_both_ways() {
    let (deps, store) = common::memory_deps();
    let held = common::seed_book(&deps, "Held", common::ISBNS[0]).await;
    let idle = common::seed_book(&deps, "Idle", common::ISBNS[1]).await;
    let steady = common::seed_book(&deps, "Steady", common::ISBNS[2]).await;
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    borrow_book(&deps, &reader, BorrowBook { book_id: held.book_id })
        .await
        .unwrap();
    store.force_availability(held.book_id, true);
    store.force_availability(idle.book_id, false);

    let repaired = reconcile_availability(&deps).await.unwrap();
    assert_eq!(repaired, 2);

    assert!(!deps.catalog.get_by_id(held.book_id).await.unwrap().unwrap().available);
    assert!(deps.catalog.get_by_id(idle.book_id).await.unwrap().unwrap().available);
    assert!(deps.catalog.get_by_id(steady.book_id).await.unwrap().unwrap().available);

    // Nothing left to repair.
    assert_eq!(reconcile_availability(&deps).await.unwrap(), 0);
}

// ============================================================================
// Transient conflicts
// ============================================================================

/// Lending store that reports a lock timeout for the first `failures` begins.
struct FlakyLendingStore {
    inner: InMemoryStore,
    failures: AtomicU32,
}

#[async_trait]
impl LendingStore for FlakyLendingStore {
    async fn begin(&self, book_id: BookId) -> Result<Box<dyn LendingTransaction>, StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict("lock timeout".into()));
        }
        self.inner.begin(book_id).await
    }
}

async fn flaky_setup(failures: u32) -> (library_lending::application::ServiceDependencies, CallerContext, BookId) {
    let (mut deps, store) = common::memory_deps();
    let book = common::seed_book(&deps, "Contended", common::ISBNS[0]).await;
    let reader = common::seed_user(&deps, "reader@example.com", false).await;

    deps.lending = Arc::new(FlakyLendingStore {
        inner: store,
        failures: AtomicU32::new(failures),
    });
    (deps, reader, book.book_id)
}

#[tokio::test]
async fn test_transient_conflicts_are_retried() {
    let (deps, reader, book_id) = flaky_setup(2).await;

    let loan = borrow_book(&deps, &reader, BorrowBook { book_id }).await;
    assert!(loan.is_ok());
}

#[tokio::test]
async fn test_conflicts_surface_after_three_attempts() {
    let (deps, reader, book_id) = flaky_setup(3).await;

    let err = borrow_book(&deps, &reader, BorrowBook { book_id })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::Store(ref e) if e.is_transient()));

    // Nothing was written.
    assert!(deps.ledger.find_open_loan_by_book(book_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lifecycle_errors_are_not_retried() {
    let (deps, reader, book_id) = flaky_setup(0).await;
    let other = CallerContext::user(UserId::new());

    borrow_book(&deps, &reader, BorrowBook { book_id }).await.unwrap();
    let err = borrow_book(&deps, &other, BorrowBook { book_id })
        .await
        .unwrap_err();
    assert!(matches!(err, LoanApplicationError::BookUnavailable));
}
