use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, BorrowError, LoanId, ReturnError, UserId};

/// Lifecycle state of a single loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Borrowed and not yet returned
    Open,
    /// Returned. Terminal for this loan; the book can be lent again under a new loan.
    Closed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Open => "open",
            LoanStatus::Closed => "closed",
        }
    }
}

/// One borrow event in the ledger.
///
/// `borrowed_at` never changes after creation; `returned_at` is written
/// exactly once, by a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn status(&self) -> LoanStatus {
        if self.is_open() {
            LoanStatus::Open
        } else {
            LoanStatus::Closed
        }
    }
}

/// Pure function: lend `book` to `user_id`.
///
/// `own_open_loan` is the caller's open loan for this book, `holder` the open
/// loan for this book by anyone. The ledger is authoritative: a book with an
/// open loan is unavailable even if its cached flag says otherwise.
///
/// Returns the new open loan. The caller persists it together with
/// `available = false`.
pub fn borrow_book(
    book: &Book,
    user_id: UserId,
    own_open_loan: Option<&Loan>,
    holder: Option<&Loan>,
    borrowed_at: DateTime<Utc>,
) -> Result<Loan, BorrowError> {
    if own_open_loan.is_some_and(Loan::is_open) {
        return Err(BorrowError::AlreadyBorrowed);
    }

    if !book.available || holder.is_some_and(Loan::is_open) {
        return Err(BorrowError::BookUnavailable);
    }

    Ok(Loan {
        loan_id: LoanId::new(),
        book_id: book.book_id,
        user_id,
        borrowed_at,
        returned_at: None,
    })
}

/// Pure function: close `loan` on behalf of `user_id`.
///
/// Only the borrower can return, and only once. The return time is the
/// server clock, never the client's.
pub fn return_book(
    loan: &Loan,
    user_id: UserId,
    returned_at: DateTime<Utc>,
) -> Result<Loan, ReturnError> {
    if !loan.is_open() || loan.user_id != user_id {
        return Err(ReturnError::NoActiveLoan);
    }

    Ok(Loan {
        // Guards against a server clock that stepped backwards.
        returned_at: Some(returned_at.max(loan.borrowed_at)),
        ..loan.clone()
    })
}

/// Pure function: the availability flag the ledger implies for a book.
pub fn expected_availability(open_loan: Option<&Loan>) -> bool {
    !open_loan.is_some_and(Loan::is_open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Isbn;
    use chrono::Duration;

    fn available_book() -> Book {
        let now = Utc::now();
        Book {
            book_id: BookId::new(),
            title: "Django for Beginners".to_string(),
            author: "William S. Vincent".to_string(),
            isbn: Isbn::parse("0306406152").unwrap(),
            page_count: 250,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_borrow_book_creates_open_loan() {
        let book = available_book();
        let user_id = UserId::new();
        let borrowed_at = Utc::now();

        let loan = borrow_book(&book, user_id, None, None, borrowed_at).unwrap();

        assert_eq!(loan.book_id, book.book_id);
        assert_eq!(loan.user_id, user_id);
        assert_eq!(loan.borrowed_at, borrowed_at);
        assert_eq!(loan.returned_at, None);
        assert_eq!(loan.status(), LoanStatus::Open);
    }

    #[test]
    fn test_borrow_book_fails_when_flag_unavailable() {
        let mut book = available_book();
        book.available = false;

        let result = borrow_book(&book, UserId::new(), None, None, Utc::now());
        assert_eq!(result.unwrap_err(), BorrowError::BookUnavailable);
    }

    #[test]
    fn test_borrow_book_fails_when_ledger_has_holder() {
        // Flag drifted to true but the ledger still shows an open loan.
        let book = available_book();
        let holder = borrow_book(&book, UserId::new(), None, None, Utc::now()).unwrap();

        let result = borrow_book(&book, UserId::new(), None, Some(&holder), Utc::now());
        assert_eq!(result.unwrap_err(), BorrowError::BookUnavailable);
    }

    #[test]
    fn test_borrow_book_reports_already_borrowed_for_own_loan() {
        let mut book = available_book();
        let user_id = UserId::new();
        let loan = borrow_book(&book, user_id, None, None, Utc::now()).unwrap();
        book.available = false;

        let result = borrow_book(&book, user_id, Some(&loan), Some(&loan), Utc::now());
        assert_eq!(result.unwrap_err(), BorrowError::AlreadyBorrowed);
    }

    #[test]
    fn test_borrow_book_ignores_closed_loans() {
        let book = available_book();
        let user_id = UserId::new();
        let loan = borrow_book(&book, user_id, None, None, Utc::now()).unwrap();
        let closed = return_book(&loan, user_id, Utc::now()).unwrap();

        let again = borrow_book(&book, user_id, Some(&closed), Some(&closed), Utc::now());
        assert!(again.is_ok());
        assert_ne!(again.unwrap().loan_id, loan.loan_id);
    }

    #[test]
    fn test_return_book_success() {
        let book = available_book();
        let user_id = UserId::new();
        let borrowed_at = Utc::now();
        let loan = borrow_book(&book, user_id, None, None, borrowed_at).unwrap();
        let returned_at = borrowed_at + Duration::days(7);

        let returned = return_book(&loan, user_id, returned_at).unwrap();

        assert_eq!(returned.returned_at, Some(returned_at));
        assert_eq!(returned.borrowed_at, borrowed_at);
        assert_eq!(returned.loan_id, loan.loan_id);
        assert_eq!(returned.status(), LoanStatus::Closed);
    }

    #[test]
    fn test_return_book_twice_fails() {
        let book = available_book();
        let user_id = UserId::new();
        let loan = borrow_book(&book, user_id, None, None, Utc::now()).unwrap();
        let returned = return_book(&loan, user_id, Utc::now()).unwrap();

        let result = return_book(&returned, user_id, Utc::now());
        assert_eq!(result.unwrap_err(), ReturnError::NoActiveLoan);
    }

    #[test]
    fn test_return_book_by_other_user_fails() {
        let book = available_book();
        let loan = borrow_book(&book, UserId::new(), None, None, Utc::now()).unwrap();

        let result = return_book(&loan, UserId::new(), Utc::now());
        assert_eq!(result.unwrap_err(), ReturnError::NoActiveLoan);
    }

    #[test]
    fn test_return_book_never_precedes_borrow() {
        let book = available_book();
        let user_id = UserId::new();
        let borrowed_at = Utc::now();
        let loan = borrow_book(&book, user_id, None, None, borrowed_at).unwrap();

        let returned = return_book(&loan, user_id, borrowed_at - Duration::seconds(3)).unwrap();
        assert_eq!(returned.returned_at, Some(borrowed_at));
    }

    #[test]
    fn test_expected_availability() {
        let book = available_book();
        let user_id = UserId::new();
        let loan = borrow_book(&book, user_id, None, None, Utc::now()).unwrap();
        let closed = return_book(&loan, user_id, Utc::now()).unwrap();

        assert!(expected_availability(None));
        assert!(!expected_availability(Some(&loan)));
        assert!(expected_availability(Some(&closed)));
    }

    #[test]
    fn test_loan_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LoanStatus::Open).unwrap(), "\"open\"");
        assert_eq!(LoanStatus::Closed.as_str(), "closed");
    }
}
