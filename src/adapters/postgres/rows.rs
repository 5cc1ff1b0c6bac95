use crate::domain::{Book, BookId, Email, Isbn, Loan, LoanId, User, UserId};
use crate::ports::error::Result;
use sqlx::{Row, postgres::PgRow};

use super::error_mapping::{invalid_data, map_sqlx_error};

pub(super) const BOOK_COLUMNS: &str =
    "id, title, author, isbn, page_count, available, created_at, updated_at";

pub(super) const LOAN_COLUMNS: &str = "id, book_id, user_id, borrowed_at, returned_at";

pub(super) const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, \
     date_of_birth, is_active, is_staff, created_at, updated_at";

/// Convert a `books` row. Stored ISBNs are re-validated on the way out.
pub(super) fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let isbn: String = row.try_get("isbn").map_err(map_sqlx_error)?;
    let isbn = Isbn::parse(&isbn)
        .map_err(|e| invalid_data(format!("stored isbn {isbn:?} is invalid: {e}")))?;

    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("id").map_err(map_sqlx_error)?),
        title: row.try_get("title").map_err(map_sqlx_error)?,
        author: row.try_get("author").map_err(map_sqlx_error)?,
        isbn,
        page_count: row.try_get("page_count").map_err(map_sqlx_error)?,
        available: row.try_get("available").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

pub(super) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        loan_id: LoanId::from_uuid(row.try_get("id").map_err(map_sqlx_error)?),
        book_id: BookId::from_uuid(row.try_get("book_id").map_err(map_sqlx_error)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(map_sqlx_error)?),
        borrowed_at: row.try_get("borrowed_at").map_err(map_sqlx_error)?,
        returned_at: row.try_get("returned_at").map_err(map_sqlx_error)?,
    })
}

pub(super) fn map_row_to_user(row: &PgRow) -> Result<User> {
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let email = Email::parse(&email)
        .map_err(|_| invalid_data(format!("stored email {email:?} is invalid")))?;

    Ok(User {
        user_id: UserId::from_uuid(row.try_get("id").map_err(map_sqlx_error)?),
        email,
        password_hash: row.try_get("password_hash").map_err(map_sqlx_error)?,
        first_name: row.try_get("first_name").map_err(map_sqlx_error)?,
        last_name: row.try_get("last_name").map_err(map_sqlx_error)?,
        date_of_birth: row.try_get("date_of_birth").map_err(map_sqlx_error)?,
        is_active: row.try_get("is_active").map_err(map_sqlx_error)?,
        is_staff: row.try_get("is_staff").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}
