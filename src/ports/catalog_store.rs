use crate::domain::{Book, BookId};
use async_trait::async_trait;
use std::str::FromStr;

use super::error::Result;

/// Sort order for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookOrdering {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    TitleAsc,
    TitleDesc,
}

impl FromStr for BookOrdering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(BookOrdering::CreatedAtAsc),
            "-created_at" => Ok(BookOrdering::CreatedAtDesc),
            "title" => Ok(BookOrdering::TitleAsc),
            "-title" => Ok(BookOrdering::TitleDesc),
            _ => Err(format!("Invalid ordering: {}", s)),
        }
    }
}

/// Filters and paging for a catalog listing.
///
/// `page` is 1-based. `search` matches title or author, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub available: Option<bool>,
    pub search: Option<String>,
    pub ordering: BookOrdering,
    pub page: u32,
    pub page_size: u32,
}

impl BookQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Catalog store port.
///
/// Plain record storage for books. The availability flag is not writable
/// here; it only changes inside a lending transaction.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a book by id.
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// List books matching `query`, one page at a time.
    async fn list(&self, query: &BookQuery) -> Result<Page<Book>>;

    /// Ids of every book, for the reconciliation pass.
    async fn all_ids(&self) -> Result<Vec<BookId>>;

    /// Insert a new book. Fails with `Duplicate` on an ISBN clash.
    async fn insert(&self, book: &Book) -> Result<()>;

    /// Overwrite title, author, ISBN, page count and `updated_at`.
    ///
    /// Returns false if the book does not exist.
    async fn update_details(&self, book: &Book) -> Result<bool>;

    /// Remove a book. Returns false if it did not exist.
    ///
    /// Fails with `Referenced` while any loan points at the book.
    async fn delete(&self, book_id: BookId) -> Result<bool>;
}
