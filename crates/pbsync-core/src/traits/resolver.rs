//! Credential resolver trait.

use async_trait::async_trait;

use crate::types::Role;
use crate::{Credentials, Result};

/// Supplies credentials for each side of the migration.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Obtain credentials for `role`.
    ///
    /// Fails with a [`CredentialError`](crate::error::CredentialError) when
    /// input is missing or the user cancels.
    async fn resolve(&self, role: Role) -> Result<Credentials>;
}
