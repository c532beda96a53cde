//! Login credentials type.

use std::fmt;

use crate::types::InstanceUrl;

/// Superuser credentials for one instance.
///
/// Holds the instance URL, the identity (superuser email) and the secret
/// (password) needed to open a session.
///
/// # Security
///
/// The secret is never exposed in Debug output to prevent accidental logging.
///
/// # Example
///
/// ```
/// use pbsync_core::{Credentials, InstanceUrl};
///
/// let url = InstanceUrl::new("https://pb.example.com").unwrap();
/// let creds = Credentials::new(url, "admin@example.com", "hunter22");
/// assert_eq!(creds.identity(), "admin@example.com");
/// ```
#[derive(Clone)]
pub struct Credentials {
    url: InstanceUrl,
    identity: String,
    secret: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(url: InstanceUrl, identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url,
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Returns the instance URL.
    pub fn url(&self) -> &InstanceUrl {
        &self.url
    }

    /// Returns the identity (superuser email).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the secret.
    ///
    /// # Security
    ///
    /// Use this only when constructing authentication requests.
    /// Never log or display this value.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_hides_secret_in_debug() {
        let url = InstanceUrl::new("https://pb.example.com").unwrap();
        let creds = Credentials::new(url, "admin@example.com", "secret123");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin@example.com"));
        assert!(!debug.contains("secret123"));
        assert!(debug.contains("[REDACTED]"));
    }
}
