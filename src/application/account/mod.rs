mod account_service;
mod errors;

pub use account_service::{create_admin, login, refresh, register};
pub use errors::{AccountError, Result};
