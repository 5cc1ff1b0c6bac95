use crate::application::{account::AccountError, catalog::CatalogError, loan::LoanApplicationError};
use crate::domain::ErrorKind;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred.";

/// API layer error.
///
/// Wraps the application layer errors and maps each to an HTTP status, a
/// machine-readable kind, and a message.
#[derive(Debug)]
pub enum ApiError {
    Loan(LoanApplicationError),
    Catalog(CatalogError),
    Account(AccountError),
    /// Missing, malformed, or expired access token
    Unauthenticated(&'static str),
    /// Path parameter that cannot name any resource
    NotFound,
    /// Request body or query string that does not parse
    BadRequest(String),
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        ApiError::Account(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ValidationError
        | ErrorKind::BookUnavailable
        | ErrorKind::AlreadyBorrowed
        | ErrorKind::NoActiveLoan => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn parts(&self) -> (ErrorKind, String, Option<&'static str>) {
        match self {
            ApiError::Loan(err) => (err.kind(), err.to_string(), None),
            ApiError::Catalog(err) => (err.kind(), err.to_string(), err.field()),
            ApiError::Account(err) => (err.kind(), err.to_string(), err.field()),
            ApiError::Unauthenticated(msg) => (ErrorKind::Unauthenticated, msg.to_string(), None),
            ApiError::NotFound => (ErrorKind::NotFound, "Not found.".to_string(), None),
            ApiError::BadRequest(msg) => (ErrorKind::ValidationError, msg.clone(), None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, message, field) = self.parts();

        // Internal error detail goes to the log, never to the client.
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = ?self, "internal error while handling request");
            INTERNAL_MESSAGE.to_string()
        } else {
            message
        };

        let body = Json(ErrorResponse::new(kind, message, field));
        (status_for(kind), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StoreError;

    #[test]
    fn test_lifecycle_errors_are_bad_requests() {
        for err in [
            LoanApplicationError::BookUnavailable,
            LoanApplicationError::AlreadyBorrowed,
            LoanApplicationError::NoActiveLoan,
        ] {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_store_errors_hide_detail() {
        let err = ApiError::from(LoanApplicationError::Store(StoreError::backend(
            "connection refused",
        )));
        let (kind, _, _) = err.parts();
        assert_eq!(kind, ErrorKind::Internal);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forbidden_and_not_found() {
        assert_eq!(
            ApiError::from(CatalogError::Forbidden).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(LoanApplicationError::BookNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
