//! Backup operation types.
//!
//! This module defines the values exchanged with an instance during a
//! migration. The operations themselves are methods on
//! [`Session`](crate::Session).

mod types;

pub use types::{ByteSource, ByteStream, DownloadDescriptor, HealthStatus};
