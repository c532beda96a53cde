//! The migration pipeline.
//!
//! A run moves the full state of the source instance onto the target
//! instance in a fixed sequence of stages. Most stages are fatal: their
//! failure stops the run immediately and is reported as a
//! [`MigrationError`] naming the stage. Cleanup of backup copies is
//! best-effort: its failure becomes a [`Warning`] on the final
//! [`MigrationReport`] and the run goes on.
//!
//! Nothing is rolled back. A failed run leaves behind whatever it had
//! created up to that point.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::Error;
use crate::poll::{self, PollConfig};
use crate::traits::{Backend, CredentialResolver, MigrationObserver, Session};
use crate::transfer;
use crate::types::{BackupName, Role};

/// Default directory for local artifacts.
pub const DEFAULT_BACKUP_DIR: &str = "backups";

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResolveSourceCredentials,
    AuthenticateSource,
    ResolveTargetCredentials,
    AuthenticateTarget,
    CheckCapability,
    CreateBackup,
    Download,
    DeleteSourceBackup,
    Upload,
    RemoveLocalArtifact,
    Restore,
    AwaitReady,
    DeleteTargetBackup,
}

impl Stage {
    /// Status line shown while the stage runs.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::ResolveSourceCredentials => "Reading source credentials...",
            Stage::AuthenticateSource => "Authenticating with source...",
            Stage::ResolveTargetCredentials => "Reading target credentials...",
            Stage::AuthenticateTarget => "Authenticating with target...",
            Stage::CheckCapability => "Checking if source can be backed up...",
            Stage::CreateBackup => "Creating backup...",
            Stage::Download => "Downloading backup...",
            Stage::DeleteSourceBackup => "Deleting source backup...",
            Stage::Upload => "Uploading backup...",
            Stage::RemoveLocalArtifact => "Cleaning up...",
            Stage::Restore => "Restoring backup...",
            Stage::AwaitReady => "Waiting for target instance to start...",
            Stage::DeleteTargetBackup => "Deleting target backup...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResolveSourceCredentials => "resolve source credentials",
            Stage::AuthenticateSource => "authenticate source",
            Stage::ResolveTargetCredentials => "resolve target credentials",
            Stage::AuthenticateTarget => "authenticate target",
            Stage::CheckCapability => "check source capability",
            Stage::CreateBackup => "create backup",
            Stage::Download => "download backup",
            Stage::DeleteSourceBackup => "delete source backup",
            Stage::Upload => "upload backup",
            Stage::RemoveLocalArtifact => "remove local backup",
            Stage::Restore => "restore backup",
            Stage::AwaitReady => "wait for target",
            Stage::DeleteTargetBackup => "delete target backup",
        };
        f.write_str(name)
    }
}

/// A fatal stage failure.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct MigrationError {
    /// The stage that failed.
    pub stage: Stage,
    /// What went wrong.
    #[source]
    pub source: Error,
}

impl MigrationError {
    /// Whether the run stopped because it was interrupted.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.source,
            Error::Cancelled | Error::Credential(crate::error::CredentialError::Cancelled)
        )
    }
}

/// A tolerated failure of a best-effort stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The stage that failed.
    pub stage: Stage,
    /// What went wrong, including what the operator has to clean up.
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// Name of the artifact used for this run.
    pub backup_name: BackupName,
    /// Size of the transferred artifact.
    pub bytes: u64,
    /// Number of health probes until the target answered again.
    pub probes: u32,
    /// Every tolerated failure, in order.
    pub warnings: Vec<Warning>,
}

impl MigrationReport {
    /// Whether all cleanup succeeded too.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Knobs of a run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Where the artifact is stored between download and upload.
    pub backup_dir: PathBuf,
    /// Readiness poll after restore.
    pub poll: PollConfig,
    /// Use this name instead of generating one.
    pub backup_name: Option<BackupName>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            poll: PollConfig::default(),
            backup_name: None,
        }
    }
}

/// Sequences one migration from source to target.
pub struct Migration<'a, B, R, O: ?Sized> {
    backend: &'a B,
    resolver: &'a R,
    observer: &'a O,
    config: MigrationConfig,
    cancel: CancellationToken,
}

impl<'a, B, R, O> Migration<'a, B, R, O>
where
    B: Backend,
    R: CredentialResolver,
    O: MigrationObserver + ?Sized,
{
    /// Create a run over the given collaborators.
    pub fn new(backend: &'a B, resolver: &'a R, observer: &'a O, config: MigrationConfig) -> Self {
        Self {
            backend,
            resolver,
            observer,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every stage in order.
    #[instrument(skip(self), fields(backup_dir = %self.config.backup_dir.display()))]
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let credentials = self
            .fatal(
                Stage::ResolveSourceCredentials,
                self.resolver.resolve(Role::Source),
            )
            .await?;
        let source = self
            .fatal(
                Stage::AuthenticateSource,
                self.backend.authenticate(Role::Source, credentials),
            )
            .await?;

        let credentials = self
            .fatal(
                Stage::ResolveTargetCredentials,
                self.resolver.resolve(Role::Target),
            )
            .await?;
        let target = self
            .fatal(
                Stage::AuthenticateTarget,
                self.backend.authenticate(Role::Target, credentials),
            )
            .await?;

        self.fatal(Stage::CheckCapability, source.check_capability())
            .await?;

        let name = self
            .config
            .backup_name
            .clone()
            .unwrap_or_else(BackupName::generate);
        info!(%name, "Using backup name");
        self.fatal(Stage::CreateBackup, source.create_backup(&name))
            .await?;

        let local_path = name.local_path(&self.config.backup_dir);
        let bytes = self
            .fatal(
                Stage::Download,
                transfer::download_backup(
                    &source,
                    &name,
                    &local_path,
                    self.observer,
                    &self.cancel,
                ),
            )
            .await?;

        let mut warnings = Vec::new();

        self.best_effort(
            &mut warnings,
            Stage::DeleteSourceBackup,
            source.delete_backup(&name),
            "you have to delete it from the source manually",
        )
        .await?;

        self.fatal(
            Stage::Upload,
            transfer::upload(&target, &local_path, &name),
        )
        .await?;

        self.best_effort(
            &mut warnings,
            Stage::RemoveLocalArtifact,
            transfer::remove_local(&local_path),
            "you have to delete the local file manually",
        )
        .await?;

        self.fatal(Stage::Restore, target.restore_backup(&name))
            .await?;

        let probes = self
            .fatal(
                Stage::AwaitReady,
                poll::await_ready(&target, &self.config.poll, &self.cancel),
            )
            .await?;

        self.best_effort(
            &mut warnings,
            Stage::DeleteTargetBackup,
            target.delete_backup(&name),
            "you have to delete it from the target manually",
        )
        .await?;

        info!(%name, bytes, probes, warnings = warnings.len(), "Migration completed");

        Ok(MigrationReport {
            backup_name: name,
            bytes,
            probes,
            warnings,
        })
    }

    /// Run a stage whose failure ends the run.
    async fn fatal<T, F>(&self, stage: Stage, operation: F) -> Result<T, MigrationError>
    where
        F: Future<Output = crate::Result<T>>,
    {
        self.observer.stage_started(stage);
        info!(%stage, "Starting stage");

        // Poll the operation first so stages that handle cancellation
        // themselves get to clean up.
        let result = tokio::select! {
            biased;
            result = operation => result,
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
        };

        result.map_err(|source| MigrationError { stage, source })
    }

    /// Run a stage whose failure is recorded and tolerated.
    ///
    /// Only cancellation ends the run.
    async fn best_effort<F>(
        &self,
        warnings: &mut Vec<Warning>,
        stage: Stage,
        operation: F,
        remedy: &str,
    ) -> Result<(), MigrationError>
    where
        F: Future<Output = crate::Result<()>>,
    {
        match self.fatal(stage, operation).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.source, Error::Cancelled) => Err(e),
            Err(e) => {
                let warning = Warning {
                    stage,
                    message: format!("{} ({}, continuing)", e.source, remedy),
                };
                warn!(%stage, error = %e.source, "Best-effort stage failed");
                self.observer.warned(&warning);
                warnings.push(warning);
                Ok(())
            }
        }
    }
}
