//! Core pbsync types.
//!
//! These types enforce their invariants at construction time, so a value
//! that exists is a value that can be sent to an instance.

mod backup_name;
mod instance_url;
mod role;

pub use backup_name::{BACKUP_PREFIX, BackupName};
pub use instance_url::InstanceUrl;
pub use role::Role;
