//! Backup artifact name.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};

use crate::error::{Error, InvalidInputError};

/// Prefix of every artifact created by a sync run.
pub const BACKUP_PREFIX: &str = "sync-backup-";

/// Name of a backup artifact.
///
/// The same name identifies the artifact on the source instance, on local
/// disk and on the target instance for one run, so it is restricted to
/// characters that are safe both as a URL path segment and as a file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackupName(String);

impl BackupName {
    /// Validate an existing backup name.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();

        let reason = match s.strip_suffix(".zip") {
            None | Some("") => Some("must end with .zip"),
            Some(stem)
                if !stem.chars().all(|c| {
                    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_')
                }) =>
            {
                Some("only lowercase letters, digits, '-' and '_' are allowed before .zip")
            }
            Some(_) => None,
        };

        match reason {
            Some(reason) => Err(InvalidInputError::BackupName {
                value: s,
                reason: reason.to_string(),
            }
            .into()),
            None => Ok(Self(s)),
        }
    }

    /// Generate the name for a run started now.
    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    /// Generate the name for a run started at `now`:
    /// `sync-backup-<YYYY-MM-DD>-<seconds>.zip`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{}-{}.zip",
            BACKUP_PREFIX,
            now.format("%Y-%m-%d"),
            now.second()
        ))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the local path of the artifact inside `dir`.
    pub fn local_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(&self.0)
    }
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BackupName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BackupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
