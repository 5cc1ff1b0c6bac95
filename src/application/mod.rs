pub mod account;
pub mod catalog;
pub mod loan;

use crate::ports::*;
use std::sync::Arc;

/// Service dependencies.
///
/// Plain data: every service is a free function taking this struct, so all
/// collaborators are explicit and tests can wire in any adapter.
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog: Arc<dyn CatalogStore>,
    pub ledger: Arc<dyn LoanLedger>,
    pub lending: Arc<dyn LendingStore>,
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
}
