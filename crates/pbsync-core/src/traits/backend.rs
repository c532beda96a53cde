//! Backend trait.

use async_trait::async_trait;

use crate::types::Role;
use crate::{Credentials, Result};

use super::Session;

/// A way of opening authenticated sessions against instances.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Session type produced by this backend.
    type Session: Session;

    /// Log in to the instance named by `credentials`.
    ///
    /// Succeeds only if the login call succeeded and the resulting session
    /// holds a valid token. The credentials are consumed.
    async fn authenticate(&self, role: Role, credentials: Credentials) -> Result<Self::Session>;
}
