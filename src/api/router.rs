use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, borrow_book, create_book, delete_book, get_book, list_books, list_loans, login,
    refresh_token, register, return_book, update_book,
};

/// Creates the API router
///
/// Accounts:
/// - POST /auth/register, /auth/login, /auth/refresh
///
/// Catalog (writes are admin only):
/// - GET, POST /books
/// - GET, PATCH, PUT, DELETE /books/:id
///
/// Loans (authenticated):
/// - GET /loans
/// - POST /loans/:id/borrow (id is a book id)
/// - POST /loans/:id/return (id is a loan id)
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book)
                .patch(update_book)
                .put(update_book)
                .delete(delete_book),
        )
        .route("/loans", get(list_loans))
        .route("/loans/:id/borrow", post(borrow_book))
        .route("/loans/:id/return", post(return_book))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
