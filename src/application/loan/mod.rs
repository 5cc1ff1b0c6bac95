mod errors;
mod loan_service;
mod reconciliation;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{borrow_book, list_loans, return_book};
pub use reconciliation::reconcile_availability;
