pub mod catalog_store;
pub mod credentials;
pub mod error;
pub mod lending_store;
pub mod loan_ledger;
pub mod user_repository;

pub use catalog_store::*;
pub use credentials::*;
pub use error::{StoreError, constraints};
pub use lending_store::*;
pub use loan_ledger::*;
pub use user_repository::*;
