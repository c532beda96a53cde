//! pbsync-core - Types, traits and the migration pipeline of pbsync.
//!
//! The pipeline in [`migration`] only talks to instances through the
//! [`Backend`] and [`Session`] traits, so it can be driven by the HTTP
//! implementation in `pbsync-http` or by in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use pbsync_core::migration::{Migration, MigrationConfig};
//! use pbsync_core::{Backend, CredentialResolver, NoProgress};
//!
//! # async fn example(backend: impl Backend, resolver: impl CredentialResolver) {
//! let migration = Migration::new(&backend, &resolver, &NoProgress, MigrationConfig::default());
//! match migration.run().await {
//!     Ok(report) => println!("migrated {} bytes", report.bytes),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

pub mod backup;
pub mod credentials;
pub mod error;
pub mod migration;
pub mod poll;
pub mod tokens;
pub mod traits;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod fake;

pub use backup::{ByteSource, ByteStream, DownloadDescriptor, HealthStatus};
pub use credentials::Credentials;
pub use error::Error;
pub use migration::{Migration, MigrationConfig, MigrationError, MigrationReport, Stage, Warning};
pub use poll::PollConfig;
pub use tokens::{AuthToken, FileToken};
pub use traits::{
    Backend, CredentialResolver, MigrationObserver, NoProgress, ProgressSink, Session,
};
pub use types::{BackupName, InstanceUrl, Role};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
