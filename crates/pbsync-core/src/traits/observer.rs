//! Pipeline observation.

use crate::migration::{Stage, Warning};

use super::{NoProgress, ProgressSink};

/// Receives stage transitions, tolerated failures and transfer progress of
/// a migration run.
pub trait MigrationObserver: ProgressSink {
    /// A stage is about to run.
    fn stage_started(&self, _stage: Stage) {}

    /// A best-effort stage failed and the run continues.
    fn warned(&self, _warning: &Warning) {}
}

impl MigrationObserver for NoProgress {}
