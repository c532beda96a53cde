//! Authenticated session trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;
use crate::backup::{ByteSource, DownloadDescriptor, HealthStatus};
use crate::error::{CapabilityError, Error};
use crate::types::{BackupName, InstanceUrl, Role};

/// An authenticated connection to one instance.
///
/// Every operation fails fast with
/// [`AuthError::SessionInvalid`](crate::error::AuthError::SessionInvalid)
/// once the session's token is no longer valid.
#[async_trait]
pub trait Session: Send + Sync {
    /// Returns the instance URL of this session.
    fn url(&self) -> &InstanceUrl;

    /// Returns the role this session plays in the migration.
    fn role(&self) -> Role;

    /// Whether the session's token is still valid.
    fn is_valid(&self) -> bool;

    /// Fetch the instance's health report.
    async fn health(&self) -> Result<HealthStatus>;

    /// Verify that the instance is up and able to create backups.
    ///
    /// Fails with `Unavailable` when the payload code is not 200 and with
    /// `BackupsDisabled` when backups are off, whatever the transport
    /// status was.
    async fn check_capability(&self) -> Result<()> {
        let status = match self.health().await {
            Ok(status) => status,
            Err(Error::Auth(e)) => return Err(e.into()),
            Err(e) => {
                return Err(CapabilityError::Unreachable {
                    message: e.to_string(),
                }
                .into());
            }
        };

        if !status.is_ok() {
            return Err(CapabilityError::Unavailable { code: status.code }.into());
        }
        if !status.can_backup {
            return Err(CapabilityError::BackupsDisabled.into());
        }
        Ok(())
    }

    /// Create a named backup. May take as long as compressing the whole
    /// data store.
    async fn create_backup(&self, name: &BackupName) -> Result<()>;

    /// Obtain a fresh file token and compose the artifact's download URL.
    async fn download_descriptor(&self, name: &BackupName) -> Result<DownloadDescriptor>;

    /// Start reading the artifact described by `descriptor`.
    async fn open_download(&self, descriptor: &DownloadDescriptor) -> Result<ByteSource>;

    /// Delete a named backup.
    async fn delete_backup(&self, name: &BackupName) -> Result<()>;

    /// Upload an artifact as a new backup entry named `name`.
    async fn upload_backup(&self, name: &BackupName, bytes: Bytes) -> Result<()>;

    /// Restore the instance from a named backup.
    ///
    /// The instance may restart afterwards; subsequent calls must expect the
    /// connection to drop.
    async fn restore_backup(&self, name: &BackupName) -> Result<()>;

    /// Single liveness probe, no retries.
    ///
    /// Sends no credentials and does not depend on [`Session::is_valid`].
    async fn health_check(&self) -> Result<()>;
}

