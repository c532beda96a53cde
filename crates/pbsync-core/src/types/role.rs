//! Instance role.

use std::fmt;

/// Which side of the migration an instance is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The instance the backup is taken from.
    Source,
    /// The instance the backup is restored onto.
    Target,
}

impl Role {
    /// Lower case name, used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Target => "target",
        }
    }

    /// Upper case prefix of the role's configuration keys.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Role::Source => "SOURCE",
            Role::Target => "TARGET",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
