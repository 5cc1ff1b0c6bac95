use crate::domain::CallerContext;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use super::{error::ApiError, handlers::AppState};

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";
const INVALID_TOKEN: &str = "Given token is not valid or has expired.";

/// Resolves `Authorization: Bearer <access token>` into the caller.
///
/// Handlers that take a `CallerContext` argument are authenticated routes;
/// a missing or bad token is rejected with 401 before the handler runs.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CallerContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated(MISSING_CREDENTIALS))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthenticated(MISSING_CREDENTIALS))?;

        state
            .service_deps
            .tokens
            .verify_access(token)
            .map_err(|_| ApiError::Unauthenticated(INVALID_TOKEN))
    }
}
