//! Error types for pbsync.
//!
//! This module provides a unified error type with explicit variants for
//! every failure category the migration pipeline distinguishes: credential
//! input, authentication, capability, control-plane operations, transport,
//! file transfer and input validation.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Role;

/// The unified error type for pbsync operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials could not be obtained.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Login rejected or token unusable.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Instance unreachable or not able to create backups.
    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// A control-plane call failed after authentication.
    #[error("remote operation failed: {0}")]
    RemoteOp(#[from] RemoteOpError),

    /// Network transport errors (connection, timeout, HTTP layer).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading or writing an artifact stream failed.
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Input validation errors (bad URL, bad backup name).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A liveness probe failed. Only produced while polling for readiness.
    #[error("instance unreachable: {message}")]
    Unreachable { message: String },

    /// The instance did not become ready within the configured timeout.
    #[error("instance not ready after {waited_ms}ms ({probes} probes)")]
    ReadyTimeout { waited_ms: u64, probes: u32 },

    /// The operation was interrupted.
    #[error("operation cancelled")]
    Cancelled,
}

/// Credential acquisition errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A required field was not supplied by any source.
    #[error("no {field} provided for {role}")]
    Missing { role: Role, field: &'static str },

    /// Input was interrupted by the user.
    #[error("input cancelled")]
    Cancelled,

    /// Reading the credential source failed.
    #[error("failed to read credentials: {0}")]
    Io(#[from] io::Error),
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the login.
    #[error("login rejected ({0})")]
    Rejected(ApiErrorDetail),

    /// The login call succeeded but the stored token is not usable.
    #[error("login returned no valid token")]
    TokenInvalid,

    /// An operation was attempted on a session whose token is no longer valid.
    #[error("session token is no longer valid")]
    SessionInvalid,
}

/// Capability check errors.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Health endpoint could not be reached or answered with an error status.
    #[error("instance is not available: {message}")]
    Unreachable { message: String },

    /// Health payload reported a non-200 code.
    #[error("instance reported health code {code}")]
    Unavailable { code: u16 },

    /// Instance is not configured to create backups.
    #[error("instance is not configured to backup")]
    BackupsDisabled,
}

/// A control-plane call that failed after authentication.
#[derive(Debug)]
pub struct RemoteOpError {
    /// Short name of the operation (e.g. "create backup").
    pub operation: &'static str,
    /// Status and server message.
    pub detail: ApiErrorDetail,
}

impl RemoteOpError {
    /// Create a new remote operation error.
    pub fn new(operation: &'static str, detail: ApiErrorDetail) -> Self {
        Self { operation, detail }
    }
}

impl fmt::Display for RemoteOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.detail)
    }
}

impl std::error::Error for RemoteOpError {}

/// Status and message of a failed API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorDetail {
    /// HTTP status code.
    pub status: u16,
    /// Error message from the server, if it sent one.
    pub message: Option<String>,
}

impl ApiErrorDetail {
    /// Create a new error detail.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Artifact stream errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote stream failed.
    #[error("failed to download backup: {message}")]
    Read { message: String },

    /// Writing or reading the local file failed.
    #[error("failed to access {}: {source}", path.display())]
    Local {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stream ended before the announced length was received.
    #[error("download truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid instance URL.
    #[error("invalid instance URL '{value}': {reason}")]
    InstanceUrl { value: String, reason: String },

    /// Invalid backup name.
    #[error("invalid backup name '{value}': {reason}")]
    BackupName { value: String, reason: String },
}
