//! CLI argument definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use pbsync_core::migration::{DEFAULT_BACKUP_DIR, MigrationConfig};
use pbsync_core::poll::PollConfig;

/// Copy the full state of one PocketBase instance onto another.
///
/// Credentials are read from SOURCE_URL, SOURCE_EMAIL, SOURCE_PASSWORD and
/// TARGET_URL, TARGET_EMAIL, TARGET_PASSWORD in the env file or the process
/// environment. Anything missing is prompted for.
#[derive(Parser, Debug)]
#[command(name = "pbsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// File to read credentials from
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Directory holding the backup between download and upload
    #[arg(long, value_name = "DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,

    /// Delay between readiness probes after the restore
    #[arg(long, value_name = "MS", default_value_t = 1500)]
    pub poll_interval_ms: u64,

    /// Give up waiting for the target after this many seconds (default: wait forever)
    #[arg(long, value_name = "SECS")]
    pub ready_timeout_secs: Option<u64>,
}

impl Cli {
    /// The pipeline settings selected on the command line.
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig {
            backup_dir: self.backup_dir.clone(),
            poll: PollConfig {
                interval: Duration::from_millis(self.poll_interval_ms),
                timeout: self.ready_timeout_secs.map(Duration::from_secs),
            },
            backup_name: None,
        }
    }
}
