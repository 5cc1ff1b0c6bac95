use crate::application::ServiceDependencies;
use crate::domain::user::{Registration, validate_registration};
use crate::domain::{Email, User, UserId, ValidationError};
use crate::ports::{AuthError, StoreError, TokenPair, constraints};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use super::errors::{AccountError, Result};

const EMAIL_TAKEN: &str = "Email is already registered.";

/// Hash off the async runtime; argon2 is deliberately slow.
async fn hash_password(deps: &ServiceDependencies, password: String) -> Result<String> {
    let hasher = Arc::clone(&deps.hasher);
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AccountError::Credentials(AuthError::Backend(e.to_string())))?
        .map_err(AccountError::Credentials)
}

async fn verify_password(deps: &ServiceDependencies, password: String, hash: String) -> bool {
    let hasher = Arc::clone(&deps.hasher);
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .unwrap_or(false)
}

fn email_taken(err: StoreError) -> AccountError {
    match err {
        StoreError::Duplicate(ref c) if c == constraints::USER_EMAIL_UNIQUE => {
            ValidationError::new("email", EMAIL_TAKEN).into()
        }
        other => other.into(),
    }
}

/// Open a reader account.
///
/// Checks run in order: email not yet registered, names non-empty, age at
/// least 18 on `today`, password present and confirmed, email well-formed.
/// The first failing rule is reported.
pub async fn register(
    deps: &ServiceDependencies,
    registration: Registration,
    today: NaiveDate,
) -> Result<User> {
    // A malformed address cannot be registered, so only a well-formed one
    // needs the uniqueness lookup.
    if let Ok(email) = Email::parse(&registration.email) {
        if deps.users.find_by_email(&email).await?.is_some() {
            return Err(ValidationError::new("email", EMAIL_TAKEN).into());
        }
    }

    let valid = validate_registration(registration, today)?;
    let password_hash = hash_password(deps, valid.password).await?;

    let now = Utc::now();
    let user = User {
        user_id: UserId::new(),
        email: valid.email,
        password_hash,
        first_name: valid.first_name,
        last_name: valid.last_name,
        date_of_birth: Some(valid.date_of_birth),
        is_active: true,
        is_staff: false,
        created_at: now,
        updated_at: now,
    };
    deps.users.insert(&user).await.map_err(email_taken)?;

    tracing::info!(user_id = %user.user_id, "user registered");
    Ok(user)
}

/// Exchange email and password for an access/refresh token pair.
pub async fn login(deps: &ServiceDependencies, email: &str, password: &str) -> Result<TokenPair> {
    let email = Email::parse(email).map_err(|_| AccountError::InvalidCredentials)?;

    let user = deps
        .users
        .find_by_email(&email)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AccountError::InvalidCredentials)?;

    if !verify_password(deps, password.to_string(), user.password_hash.clone()).await {
        tracing::debug!(user_id = %user.user_id, "login rejected");
        return Err(AccountError::InvalidCredentials);
    }

    Ok(deps.tokens.issue(&user)?)
}

/// Exchange a refresh token for a new access token.
///
/// The account is re-read, so a deactivated user gets nothing and the admin
/// flag reflects the account as it is now, not as it was at login.
pub async fn refresh(deps: &ServiceDependencies, refresh_token: &str) -> Result<String> {
    let user_id = deps.tokens.verify_refresh(refresh_token)?;

    let user = deps
        .users
        .get_by_id(user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AccountError::InvalidToken)?;

    Ok(deps.tokens.issue_access(&user)?)
}

/// Create the staff account used to manage the catalog.
///
/// Idempotent: an existing account with the same email is returned as is.
pub async fn create_admin(deps: &ServiceDependencies, email: &str, password: &str) -> Result<User> {
    let email = Email::parse(email).map_err(|e| ValidationError::new("email", e.to_string()))?;
    if password.is_empty() {
        return Err(ValidationError::new("password", "This field may not be blank.").into());
    }

    if let Some(existing) = deps.users.find_by_email(&email).await? {
        if !existing.is_staff {
            tracing::warn!(user_id = %existing.user_id, "admin email belongs to a non-staff account");
        }
        return Ok(existing);
    }

    let password_hash = hash_password(deps, password.to_string()).await?;
    let now = Utc::now();
    let admin = User {
        user_id: UserId::new(),
        email,
        password_hash,
        first_name: "Admin".to_string(),
        last_name: String::new(),
        date_of_birth: None,
        is_active: true,
        is_staff: true,
        created_at: now,
        updated_at: now,
    };
    deps.users.insert(&admin).await.map_err(email_taken)?;

    tracing::info!(user_id = %admin.user_id, "admin account created");
    Ok(admin)
}
