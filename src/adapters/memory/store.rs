use crate::domain::{Book, BookId, Email, Loan, LoanId, User, UserId};
use crate::ports::catalog_store::{BookOrdering, BookQuery, CatalogStore, Page};
use crate::ports::error::{Result, StoreError, constraints};
use crate::ports::loan_ledger::LoanLedger;
use crate::ports::user_repository::UserRepository;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Default)]
pub(super) struct Tables {
    pub(super) books: HashMap<BookId, Book>,
    pub(super) loans: HashMap<LoanId, Loan>,
    pub(super) users: HashMap<UserId, User>,
}

impl Tables {
    pub(super) fn loans_for_book(&self, book_id: BookId) -> impl Iterator<Item = &Loan> {
        self.loans.values().filter(move |l| l.book_id == book_id)
    }
}

/// In-memory implementation of every store port.
///
/// Cheap to clone; clones share the same tables. Lending transactions
/// serialize per book through an async mutex held for the transaction's
/// lifetime, and publish their writes under one table lock on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub(super) tables: Arc<RwLock<Tables>>,
    pub(super) book_locks: Arc<BookLocks>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn book_lock(&self, book_id: BookId) -> Arc<AsyncMutex<()>> {
        self.book_locks.entry(book_id).or_default().clone()
    }

    /// Overwrite a book's availability flag without a transaction.
    ///
    /// Lets tests simulate drift between the flag and the ledger.
    pub fn force_availability(&self, book_id: BookId, available: bool) -> bool {
        match self.tables.write().books.get_mut(&book_id) {
            Some(book) => {
                book.available = available;
                true
            }
            None => false,
        }
    }

    /// Deactivate or reactivate an account.
    pub fn set_user_active(&self, user_id: UserId, is_active: bool) -> bool {
        match self.tables.write().users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = is_active;
                true
            }
            None => false,
        }
    }
}

pub(super) type BookLocks = DashMap<BookId, Arc<AsyncMutex<()>>>;

/// Drop the book's lock entry once no transaction holds or waits on it.
///
/// Callers must have released their own clone of the lock first. Cloning
/// happens under the same shard lock as this check, so a waiter that
/// already has its clone keeps the entry alive.
pub(super) fn prune_book_lock(book_locks: &BookLocks, book_id: BookId) {
    book_locks.remove_if(&book_id, |_, lock| Arc::strong_count(lock) == 1);
}

fn matches_query(book: &Book, query: &BookQuery) -> bool {
    if query.author.as_ref().is_some_and(|a| *a != book.author) {
        return false;
    }
    if query.isbn.as_ref().is_some_and(|i| i != book.isbn.as_str()) {
        return false;
    }
    if query.available.is_some_and(|a| a != book.available) {
        return false;
    }
    if let Some(term) = &query.search {
        let term = term.to_lowercase();
        let hit = book.title.to_lowercase().contains(&term)
            || book.author.to_lowercase().contains(&term);
        if !hit {
            return false;
        }
    }
    true
}

fn sort_books(books: &mut [Book], ordering: BookOrdering) {
    // Ties fall back to the id so pages never overlap.
    match ordering {
        BookOrdering::CreatedAtDesc => books.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.book_id.value().cmp(&a.book_id.value()))
        }),
        BookOrdering::CreatedAtAsc => books.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.book_id.value().cmp(&b.book_id.value()))
        }),
        BookOrdering::TitleAsc => books.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.book_id.value().cmp(&b.book_id.value()))
        }),
        BookOrdering::TitleDesc => books.sort_by(|a, b| {
            b.title
                .cmp(&a.title)
                .then_with(|| b.book_id.value().cmp(&a.book_id.value()))
        }),
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.tables.read().books.get(&book_id).cloned())
    }

    async fn list(&self, query: &BookQuery) -> Result<Page<Book>> {
        let mut matched: Vec<Book> = self
            .tables
            .read()
            .books
            .values()
            .filter(|b| matches_query(b, query))
            .cloned()
            .collect();

        sort_books(&mut matched, query.ordering);

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn all_ids(&self) -> Result<Vec<BookId>> {
        Ok(self.tables.read().books.keys().copied().collect())
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.books.values().any(|b| b.isbn == book.isbn) {
            return Err(StoreError::Duplicate(constraints::BOOK_ISBN_UNIQUE.to_string()));
        }
        tables.books.insert(book.book_id, book.clone());
        Ok(())
    }

    async fn update_details(&self, book: &Book) -> Result<bool> {
        let mut tables = self.tables.write();
        let isbn_taken = tables
            .books
            .values()
            .any(|b| b.isbn == book.isbn && b.book_id != book.book_id);
        if isbn_taken {
            return Err(StoreError::Duplicate(constraints::BOOK_ISBN_UNIQUE.to_string()));
        }

        match tables.books.get_mut(&book.book_id) {
            Some(stored) => {
                stored.title = book.title.clone();
                stored.author = book.author.clone();
                stored.isbn = book.isbn.clone();
                stored.page_count = book.page_count;
                stored.updated_at = book.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        // Wait out any lending transaction on this book before checking references.
        let lock = self.book_lock(book_id);
        let deleted = {
            let _guard = lock.lock().await;

            let mut tables = self.tables.write();
            if tables.loans_for_book(book_id).next().is_some() {
                Err(StoreError::Referenced(
                    constraints::LOAN_BOOK_REFERENCE.to_string(),
                ))
            } else {
                Ok(tables.books.remove(&book_id).is_some())
            }
        };

        drop(lock);
        prune_book_lock(&self.book_locks, book_id);
        deleted
    }
}

#[async_trait]
impl LoanLedger for InMemoryStore {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.tables.read().loans.get(&loan_id).cloned())
    }

    async fn find_open_loan(&self, user_id: UserId, book_id: BookId) -> Result<Option<Loan>> {
        Ok(self
            .tables
            .read()
            .loans_for_book(book_id)
            .find(|l| l.user_id == user_id && l.is_open())
            .cloned())
    }

    async fn find_open_loan_by_book(&self, book_id: BookId) -> Result<Option<Loan>> {
        Ok(self
            .tables
            .read()
            .loans_for_book(book_id)
            .find(|l| l.is_open())
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .tables
            .read()
            .loans
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();

        loans.sort_by(|a, b| {
            b.borrowed_at
                .cmp(&a.borrowed_at)
                .then_with(|| a.loan_id.value().cmp(&b.loan_id.value()))
        });
        Ok(loans)
    }

    async fn has_loans_for_book(&self, book_id: BookId) -> Result<bool> {
        Ok(self.tables.read().loans_for_book(book_id).next().is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(constraints::USER_EMAIL_UNIQUE.to_string()));
        }
        tables.users.insert(user.user_id, user.clone());
        Ok(())
    }
}
