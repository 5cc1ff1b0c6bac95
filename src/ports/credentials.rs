use crate::domain::{CallerContext, User, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure inside the credential adapters.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, expired, or wrong-type token.
    #[error("token is invalid or expired")]
    InvalidToken,

    /// Hashing or signing failed.
    #[error("credential backend error: {0}")]
    Backend(String),
}

/// Access and refresh tokens issued at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// One-way password hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// False for a wrong password and for an unparseable hash alike.
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

/// Bearer token issuance and verification.
///
/// Stateless: verifying a token needs no storage and no locking.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<TokenPair, AuthError>;

    /// Resolve an access token into the caller it was issued to.
    fn verify_access(&self, token: &str) -> Result<CallerContext, AuthError>;

    /// Access token alone, for a refresh.
    fn issue_access(&self, user: &User) -> Result<String, AuthError>;

    /// Resolve a refresh token into the user it was issued to.
    ///
    /// Says nothing about whether that user may still sign in.
    fn verify_refresh(&self, refresh_token: &str) -> Result<UserId, AuthError>;
}
