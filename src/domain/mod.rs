pub mod auth;
pub mod book;
pub mod commands;
pub mod errors;
pub mod isbn;
pub mod loan;
pub mod user;
pub mod value_objects;

pub use auth::*;
pub use book::Book;
pub use errors::*;
pub use isbn::*;
pub use loan::{Loan, LoanStatus};
pub use user::User;
pub use value_objects::*;
