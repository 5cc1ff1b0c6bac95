mod catalog_store;
mod error_mapping;
mod lending_store;
mod loan_ledger;
mod rows;
mod user_repository;

pub use catalog_store::PostgresCatalogStore;
pub use lending_store::{DEFAULT_LOCK_TIMEOUT, PostgresLendingStore};
pub use loan_ledger::PostgresLoanLedger;
pub use user_repository::PostgresUserRepository;
