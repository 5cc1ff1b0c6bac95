use crate::application::{ServiceDependencies, account, catalog, loan};
use crate::domain::book::{BookChanges, BookDraft};
use crate::domain::commands::{BorrowBook, ReturnBook};
use crate::domain::user::Registration;
use crate::domain::{BookId, CallerContext, LoanId};
use crate::ports::TokenPair;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        AccessTokenResponse, BookPageResponse, BookResponse, ListBooksQuery, LoanResponse,
        LoginRequest, RefreshRequest, UserResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Accounts
// ============================================================================

/// POST /auth/register - open a reader account
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(registration) = payload?;

    let user = account::register(&state.service_deps, registration, Utc::now().date_naive()).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /auth/login - exchange credentials for tokens
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let Json(req) = payload?;

    let tokens = account::login(&state.service_deps, &req.email, &req.password).await?;

    Ok(Json(tokens))
}

/// POST /auth/refresh - new access token from a refresh token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let Json(req) = payload?;

    let access = account::refresh(&state.service_deps, &req.refresh).await?;

    Ok(Json(AccessTokenResponse { access }))
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /books - paginated, filterable catalog listing
///
/// Query parameters: author, isbn, available (exact); search (title or
/// author, case-insensitive); ordering (created_at, title, `-` for
/// descending); page, page_size.
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListBooksQuery>, QueryRejection>,
) -> Result<Json<BookPageResponse>, ApiError> {
    let Query(query) = query?;

    let page = catalog::list_books(&state.service_deps, query.into()).await?;

    Ok(Json(BookPageResponse::from(page)))
}

/// GET /books/:id
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Path(book_id) = path?;

    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;

    Ok(Json(BookResponse::from(book)))
}

/// POST /books - admin only
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(draft) = payload?;

    let book = catalog::create_book(&state.service_deps, &caller, draft).await?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PATCH /books/:id and PUT /books/:id - admin only
///
/// Both are partial updates. An `available` field in the body is ignored.
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<BookChanges>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Path(book_id) = path?;
    let Json(changes) = payload?;

    let book = catalog::update_book(
        &state.service_deps,
        &caller,
        BookId::from_uuid(book_id),
        changes,
    )
    .await?;

    Ok(Json(BookResponse::from(book)))
}

/// DELETE /books/:id - admin only
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(book_id) = path?;

    catalog::delete_book(&state.service_deps, &caller, BookId::from_uuid(book_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Loans
// ============================================================================

/// GET /loans - the caller's loans, open and closed
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = loan::list_loans(&state.service_deps, &caller).await?;

    Ok(Json(loans.into_iter().map(LoanResponse::from).collect()))
}

/// POST /loans/:id/borrow - borrow the book with this id
///
/// Enforced rules:
/// - the book exists
/// - the caller does not already hold it
/// - nobody else holds it
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let Path(book_id) = path?;

    let cmd = BorrowBook {
        book_id: BookId::from_uuid(book_id),
    };
    let loan = loan::borrow_book(&state.service_deps, &caller, cmd).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from(loan))))
}

/// POST /loans/:id/return - return the loan with this id
///
/// Any request body is ignored; the return time is the server clock.
/// An id that is not a UUID names no loan of the caller's.
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<LoanResponse>, ApiError> {
    let Path(loan_id) = path.map_err(|_| loan::LoanApplicationError::NoActiveLoan)?;

    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
    };
    let loan = loan::return_book(&state.service_deps, &caller, cmd).await?;

    Ok(Json(LoanResponse::from(loan)))
}
