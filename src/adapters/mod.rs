pub mod auth;
pub mod memory;
pub mod postgres;
