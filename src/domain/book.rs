use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, Isbn, ValidationError};

const MAX_TEXT_LEN: usize = 255;

/// Catalog entry.
///
/// `available` is a cached view of the loan ledger: true iff no open loan
/// references this book. Catalog edits never write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub page_count: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated fields for a new catalog entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub page_count: i32,
}

/// Unvalidated partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page_count: Option<i32>,
}

fn validate_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "This field may not be blank."));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::new(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LEN} characters."),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_isbn(value: &str) -> Result<Isbn, ValidationError> {
    Isbn::parse(value).map_err(|e| ValidationError::new("isbn", e.to_string()))
}

fn validate_page_count(value: i32) -> Result<i32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::new(
            "page_count",
            "Ensure this value is greater than 0.",
        ));
    }
    Ok(value)
}

/// Builds a new, available book from a draft.
pub fn create_book(draft: BookDraft, now: DateTime<Utc>) -> Result<Book, ValidationError> {
    Ok(Book {
        book_id: BookId::new(),
        title: validate_text("title", &draft.title)?,
        author: validate_text("author", &draft.author)?,
        isbn: validate_isbn(&draft.isbn)?,
        page_count: validate_page_count(draft.page_count)?,
        available: true,
        created_at: now,
        updated_at: now,
    })
}

/// Applies a partial update. The availability flag is carried over untouched.
pub fn apply_changes(
    book: &Book,
    changes: BookChanges,
    now: DateTime<Utc>,
) -> Result<Book, ValidationError> {
    let title = match changes.title {
        Some(title) => validate_text("title", &title)?,
        None => book.title.clone(),
    };
    let author = match changes.author {
        Some(author) => validate_text("author", &author)?,
        None => book.author.clone(),
    };
    let isbn = match changes.isbn {
        Some(isbn) => validate_isbn(&isbn)?,
        None => book.isbn.clone(),
    };
    let page_count = match changes.page_count {
        Some(count) => validate_page_count(count)?,
        None => book.page_count,
    };

    Ok(Book {
        title,
        author,
        isbn,
        page_count,
        updated_at: now,
        ..book.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BookDraft {
        BookDraft {
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "978-0-306-40615-7".to_string(),
            page_count: 552,
        }
    }

    #[test]
    fn test_create_book_is_available() {
        let now = Utc::now();
        let book = create_book(draft(), now).unwrap();

        assert!(book.available);
        assert_eq!(book.isbn.as_str(), "9780306406157");
        assert_eq!(book.created_at, now);
        assert_eq!(book.updated_at, now);
    }

    #[test]
    fn test_create_book_rejects_blank_title() {
        let err = create_book(
            BookDraft {
                title: "   ".to_string(),
                ..draft()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn test_create_book_rejects_bad_isbn() {
        let err = create_book(
            BookDraft {
                isbn: "0306406153".to_string(),
                ..draft()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field, "isbn");
        assert_eq!(err.message, "Invalid ISBN-10 checksum.");
    }

    #[test]
    fn test_create_book_rejects_non_positive_page_count() {
        let err = create_book(
            BookDraft {
                page_count: 0,
                ..draft()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.field, "page_count");
    }

    #[test]
    fn test_apply_changes_keeps_availability() {
        let created = Utc::now();
        let mut book = create_book(draft(), created).unwrap();
        book.available = false;

        let later = created + chrono::Duration::minutes(5);
        let updated = apply_changes(
            &book,
            BookChanges {
                title: Some("Updated Book".to_string()),
                ..Default::default()
            },
            later,
        )
        .unwrap();

        assert_eq!(updated.title, "Updated Book");
        assert_eq!(updated.author, book.author);
        assert!(!updated.available);
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.updated_at, later);
    }
}
