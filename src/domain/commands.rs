use serde::{Deserialize, Serialize};

use super::{BookId, LoanId};

/// Command: lend a book to the calling user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub book_id: BookId,
}

/// Command: close one of the calling user's loans.
///
/// Carries no return time; the service stamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
}
