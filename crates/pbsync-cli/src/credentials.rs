//! Credential resolution from a dotenv file, the environment, or prompts.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pbsync_core::error::CredentialError;
use pbsync_core::{CredentialResolver, Credentials, InstanceUrl, Role};

use crate::prompt;

/// Looks up a process environment variable.
type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// One credential field and how it is asked for.
#[derive(Debug, Clone, Copy)]
enum Field {
    Url,
    Email,
    Password,
}

impl Field {
    fn key(self, role: Role) -> String {
        let suffix = match self {
            Field::Url => "URL",
            Field::Email => "EMAIL",
            Field::Password => "PASSWORD",
        };
        format!("{}_{}", role.env_prefix(), suffix)
    }

    fn label(self) -> &'static str {
        match self {
            Field::Url => "URL",
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

/// Resolves `<ROLE>_URL`, `<ROLE>_EMAIL` and `<ROLE>_PASSWORD`.
///
/// Values from the env file win over the process environment. Whatever is
/// still missing is prompted for, the password without echo.
pub struct EnvCredentialResolver {
    file: HashMap<String, String>,
    env: EnvLookup,
    cancel: CancellationToken,
}

impl EnvCredentialResolver {
    /// Read the env file at `path`. A missing file is not an error.
    pub fn load(path: &Path, cancel: CancellationToken) -> Result<Self> {
        let file = if path.exists() {
            let entries = dotenvy::from_path_iter(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let file = entries
                .collect::<Result<HashMap<_, _>, _>>()
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!(path = %path.display(), entries = file.len(), "Loaded env file");
            file
        } else {
            debug!(path = %path.display(), "No env file");
            HashMap::new()
        };

        Ok(Self::new(
            file,
            Box::new(|key| std::env::var(key).ok()),
            cancel,
        ))
    }

    fn new(file: HashMap<String, String>, env: EnvLookup, cancel: CancellationToken) -> Self {
        Self { file, env, cancel }
    }

    /// The configured value of `field`, if any. Blank values count as unset.
    fn configured(&self, role: Role, field: Field) -> Option<String> {
        let key = field.key(role);
        let present = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        self.file
            .get(&key)
            .and_then(|v| present(v.as_str()))
            .or_else(|| (self.env)(&key).and_then(|v| present(&v)))
    }

    async fn value(&self, role: Role, field: Field) -> Result<String, CredentialError> {
        if let Some(value) = self.configured(role, field) {
            return Ok(value);
        }

        let question = format!("Enter {} {}: ", role, field.label());
        let hidden = matches!(field, Field::Password);
        let answer = prompt::ask(&question, hidden, &self.cancel).await?;

        // Passwords may legitimately carry surrounding spaces.
        let answer = if hidden {
            answer
        } else {
            answer.trim().to_string()
        };
        if answer.is_empty() {
            return Err(CredentialError::Missing {
                role,
                field: field.label(),
            });
        }
        Ok(answer)
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, role: Role) -> pbsync_core::Result<Credentials> {
        let url = self.value(role, Field::Url).await?;
        let url = InstanceUrl::new(url)?;
        let email = self.value(role, Field::Email).await?;
        let password = self.value(role, Field::Password).await?;

        debug!(%role, %url, "Resolved credentials");
        Ok(Credentials::new(url, email, password))
    }
}
