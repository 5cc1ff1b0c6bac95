use crate::application::ServiceDependencies;
use crate::domain::book::{self, BookChanges, BookDraft};
use crate::domain::{Book, BookId, CallerContext, ValidationError, require_admin};
use crate::ports::{BookOrdering, BookQuery, StoreError, constraints};
use chrono::Utc;

use super::errors::{CatalogError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Listing parameters as received. Everything is optional.
#[derive(Debug, Clone, Default)]
pub struct ListBooks {
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub available: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One page of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl BookPage {
    pub fn next_page(&self) -> Option<u32> {
        let shown = u64::from(self.page) * u64::from(self.page_size);
        (shown < self.total).then_some(self.page + 1)
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.page > 1).then_some(self.page - 1)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn to_query(params: ListBooks) -> Result<BookQuery> {
    let ordering = match non_blank(params.ordering) {
        Some(raw) => raw
            .parse::<BookOrdering>()
            .map_err(|msg| ValidationError::new("ordering", msg))?,
        None => BookOrdering::default(),
    };

    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(CatalogError::InvalidPage);
    }

    let page_size = match params.page_size {
        None | Some(0) => DEFAULT_PAGE_SIZE,
        Some(size) => size.min(MAX_PAGE_SIZE),
    };

    Ok(BookQuery {
        author: non_blank(params.author),
        // Stored ISBNs carry no separators.
        isbn: non_blank(params.isbn)
            .map(|isbn| isbn.chars().filter(|c| !matches!(c, '-' | ' ')).collect()),
        available: params.available,
        search: non_blank(params.search),
        ordering,
        page,
        page_size,
    })
}

/// List the catalog. Open to anyone.
pub async fn list_books(deps: &ServiceDependencies, params: ListBooks) -> Result<BookPage> {
    let query = to_query(params)?;
    let result = deps.catalog.list(&query).await?;

    // Page 1 always exists, even for an empty catalog.
    if query.page > 1 && result.items.is_empty() {
        return Err(CatalogError::InvalidPage);
    }

    Ok(BookPage {
        books: result.items,
        total: result.total,
        page: query.page,
        page_size: query.page_size,
    })
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog
        .get_by_id(book_id)
        .await?
        .ok_or(CatalogError::NotFound)
}

fn duplicate_isbn(err: StoreError) -> CatalogError {
    match err {
        StoreError::Duplicate(ref c) if c == constraints::BOOK_ISBN_UNIQUE => {
            ValidationError::new("isbn", "book with this isbn already exists.").into()
        }
        other => other.into(),
    }
}

/// Add a book. Admin only. New books are always available.
pub async fn create_book(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    draft: BookDraft,
) -> Result<Book> {
    require_admin(caller)?;

    let book = book::create_book(draft, Utc::now())?;
    deps.catalog.insert(&book).await.map_err(duplicate_isbn)?;

    tracing::info!(book_id = %book.book_id, isbn = %book.isbn, "book added to catalog");
    Ok(book)
}

/// Edit a book's descriptive fields. Admin only.
///
/// The availability flag is never written here; the returned book carries
/// whatever the store holds after the update.
pub async fn update_book(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    book_id: BookId,
    changes: BookChanges,
) -> Result<Book> {
    require_admin(caller)?;

    let current = get_book(deps, book_id).await?;
    let updated = book::apply_changes(&current, changes, Utc::now())?;

    let found = deps
        .catalog
        .update_details(&updated)
        .await
        .map_err(duplicate_isbn)?;
    if !found {
        return Err(CatalogError::NotFound);
    }

    tracing::info!(book_id = %book_id, "book updated");
    get_book(deps, book_id).await
}

/// Remove a book that has never been lent. Admin only.
pub async fn delete_book(
    deps: &ServiceDependencies,
    caller: &CallerContext,
    book_id: BookId,
) -> Result<()> {
    require_admin(caller)?;

    if deps.ledger.has_loans_for_book(book_id).await? {
        return Err(CatalogError::HasLoanHistory);
    }

    // A borrow can still slip in between the check and the delete; the
    // store's reference check catches that.
    let deleted = deps.catalog.delete(book_id).await.map_err(|err| match err {
        StoreError::Referenced(_) => CatalogError::HasLoanHistory,
        other => other.into(),
    })?;
    if !deleted {
        return Err(CatalogError::NotFound);
    }

    tracing::info!(book_id = %book_id, "book deleted");
    Ok(())
}
