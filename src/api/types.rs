use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::catalog::{BookPage, ListBooks};
use crate::domain::{Book, ErrorKind, Loan, User};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Account profile. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id.value(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            date_of_birth: user.date_of_birth,
        }
    }
}

/// Query parameters for GET /books
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub available: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<ListBooksQuery> for ListBooks {
    fn from(query: ListBooksQuery) -> Self {
        Self {
            author: query.author,
            isbn: query.isbn,
            available: query.available,
            search: query.search,
            ordering: query.ordering,
            page: query.page,
            page_size: query.page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub page_count: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.book_id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn.as_str().to_string(),
            page_count: book.page_count,
            available: book.available,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Paginated catalog listing. `next` and `previous` are page numbers.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookPageResponse {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<BookResponse>,
}

impl From<BookPage> for BookPageResponse {
    fn from(page: BookPage) -> Self {
        Self {
            count: page.total,
            page: page.page,
            page_size: page.page_size,
            next: page.next_page(),
            previous: page.previous_page(),
            results: page.books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

/// Loan response (borrow, return, GET /loans)
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.loan_id.value(),
            book_id: loan.book_id.value(),
            user_id: loan.user_id.value(),
            borrowed_at: loan.borrowed_at,
            returned_at: loan.returned_at,
            status: loan.status().as_str().to_string(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>, field: Option<&str>) -> Self {
        Self {
            error: kind.as_str().to_string(),
            message: message.into(),
            field: field.map(str::to_string),
        }
    }
}
