use crate::domain::{Email, User, UserId};
use async_trait::async_trait;

use super::error::Result;

/// User account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Look up by normalized email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>>;

    /// Insert a new account. Fails with `Duplicate` if the email is taken.
    async fn insert(&self, user: &User) -> Result<()>;
}
