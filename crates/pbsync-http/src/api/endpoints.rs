//! Endpoint paths and request/response types.

use serde::{Deserialize, Serialize};

use pbsync_core::BackupName;

// ============================================================================
// Endpoint Paths (relative to `<base>/api/`)
// ============================================================================

/// Password login of the superusers collection.
pub const AUTH_WITH_PASSWORD: &str = "collections/_superusers/auth-with-password";

/// Health report.
pub const HEALTH: &str = "health";

/// Backup collection (create).
pub const BACKUPS: &str = "backups";

/// Multipart backup upload.
pub const BACKUPS_UPLOAD: &str = "backups/upload";

/// Protected file token.
pub const FILES_TOKEN: &str = "files/token";

/// Path of a single backup (download, delete).
pub fn backup_path(name: &BackupName) -> String {
    format!("{}/{}", BACKUPS, name)
}

/// Path that restores a single backup.
pub fn restore_path(name: &BackupName) -> String {
    format!("{}/{}/restore", BACKUPS, name)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for auth-with-password.
#[derive(Debug, Serialize)]
pub struct AuthWithPasswordRequest<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

/// Response from auth-with-password.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub record: Option<AuthRecord>,
}

/// The authenticated superuser.
#[derive(Debug, Deserialize)]
pub struct AuthRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response from health.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: HealthData,
}

/// Details of a health response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    #[serde(default)]
    pub can_backup: bool,
}

/// Request body for creating a backup.
#[derive(Debug, Serialize)]
pub struct CreateBackupRequest<'a> {
    pub name: &'a str,
}

/// Response from files/token.
#[derive(Debug, Deserialize)]
pub struct FileTokenResponse {
    pub token: String,
}

/// Error body returned by PocketBase.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    /// The message, extended with the first field error if the server sent
    /// validation details.
    pub fn describe(self) -> Option<String> {
        let field_error = self
            .data
            .as_ref()
            .and_then(|d| d.as_object())
            .and_then(|fields| fields.iter().next())
            .and_then(|(field, detail)| {
                detail
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| format!("{}: {}", field, m))
            });

        match (self.message, field_error) {
            (Some(message), Some(field)) => Some(format!("{} ({})", message, field)),
            (Some(message), None) => Some(message),
            (None, field) => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_paths() {
        let name = BackupName::new("sync-backup-2024-01-01-30.zip").unwrap();
        assert_eq!(backup_path(&name), "backups/sync-backup-2024-01-01-30.zip");
        assert_eq!(
            restore_path(&name),
            "backups/sync-backup-2024-01-01-30.zip/restore"
        );
    }

    #[test]
    fn health_response_parses_can_backup() {
        let health: HealthResponse = serde_json::from_str(
            r#"{"code":200,"message":"API is healthy.","data":{"canBackup":true}}"#,
        )
        .unwrap();
        assert_eq!(health.code, 200);
        assert!(health.data.can_backup);
    }

    #[test]
    fn health_response_without_data_cannot_backup() {
        let health: HealthResponse =
            serde_json::from_str(r#"{"code":200,"message":"API is healthy."}"#).unwrap();
        assert!(!health.data.can_backup);
    }

    #[test]
    fn error_description_includes_field_error() {
        let error: ApiErrorResponse = serde_json::from_str(
            r#"{"code":400,"message":"Failed to create backup.","data":{"name":{"code":"validation_invalid","message":"Invalid name."}}}"#,
        )
        .unwrap();
        assert_eq!(
            error.describe().as_deref(),
            Some("Failed to create backup. (name: Invalid name.)")
        );
    }
}
