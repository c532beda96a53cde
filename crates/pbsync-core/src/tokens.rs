//! Auth and file tokens.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;

/// A superuser auth token returned by a password login.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Only inspected to read its expiry
#[derive(Clone)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token can still be used.
    ///
    /// An empty token is never valid. A JWT whose payload carries an `exp`
    /// claim is valid until that instant; any other non-empty token is
    /// treated as opaque and valid.
    pub fn is_valid(&self) -> bool {
        if self.0.trim().is_empty() {
            return false;
        }
        match self.expires_at() {
            Some(exp) => exp > Utc::now().timestamp(),
            None => !self.looks_like_jwt(),
        }
    }

    fn looks_like_jwt(&self) -> bool {
        self.0.split('.').count() == 3
    }

    /// The `exp` claim of a JWT token, in seconds since the epoch.
    fn expires_at(&self) -> Option<i64> {
        let mut parts = self.0.split('.');
        let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
        claims.get("exp")?.as_i64()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&"[REDACTED]").finish()
    }
}

/// A short-lived token granting access to protected files such as backups.
#[derive(Clone)]
pub struct FileToken(String);

impl FileToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in query strings.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{},"type":"auth"}}"#, exp));
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn auth_token_hides_value_in_debug() {
        let token = AuthToken::new("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("eyJ"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn empty_token_is_invalid() {
        assert!(!AuthToken::new("").is_valid());
        assert!(!AuthToken::new("   ").is_valid());
    }

    #[test]
    fn unexpired_jwt_is_valid() {
        let exp = Utc::now().timestamp() + 3600;
        assert!(AuthToken::new(jwt_with_exp(exp)).is_valid());
    }

    #[test]
    fn expired_jwt_is_invalid() {
        let exp = Utc::now().timestamp() - 10;
        assert!(!AuthToken::new(jwt_with_exp(exp)).is_valid());
    }

    #[test]
    fn malformed_jwt_is_invalid() {
        assert!(!AuthToken::new("aaa.%%%.ccc").is_valid());
    }

    #[test]
    fn opaque_token_is_valid() {
        assert!(AuthToken::new("opaque-token").is_valid());
    }
}
