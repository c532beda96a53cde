//! HTTP-backed session implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, instrument};

use pbsync_core::backup::{ByteSource, DownloadDescriptor, HealthStatus};
use pbsync_core::error::{AuthError, Error, TransferError};
use pbsync_core::transfer::ARCHIVE_CONTENT_TYPE;
use pbsync_core::{AuthToken, BackupName, Credentials, FileToken, InstanceUrl, Result, Role};
use pbsync_core::Session as SessionTrait;

use crate::api::*;

/// Upper bound for a single liveness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated superuser session on one PocketBase instance.
///
/// Sessions are cheap to clone and never refresh their token: once the
/// token expires every operation fails with
/// [`AuthError::SessionInvalid`].
#[derive(Clone)]
pub struct HttpSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    role: Role,
    client: ApiClient,
    token: AuthToken,
}

impl HttpSession {
    /// Log in with the superuser credentials.
    ///
    /// # Errors
    ///
    /// [`AuthError::Rejected`] if the server refuses the login,
    /// [`AuthError::TokenInvalid`] if it accepts it but the returned token
    /// cannot be used.
    #[instrument(skip(client, credentials), fields(url = %client.base(), identity = %credentials.identity()))]
    pub async fn login(client: ApiClient, role: Role, credentials: &Credentials) -> Result<Self> {
        info!("Authenticating");

        let request = AuthWithPasswordRequest {
            identity: credentials.identity(),
            password: credentials.secret(),
        };

        let response: AuthResponse = client
            .call(
                client
                    .request(Method::POST, AUTH_WITH_PASSWORD, None)
                    .json(&request),
            )
            .await
            .map_err(CallError::into_auth)?;

        let token = AuthToken::new(response.token);
        if !token.is_valid() {
            return Err(AuthError::TokenInvalid.into());
        }

        if let Some(record) = response.record {
            debug!(id = %record.id, email = ?record.email, "Authenticated as superuser");
        }

        Ok(Self {
            inner: Arc::new(SessionInner {
                role,
                client,
                token,
            }),
        })
    }

    /// The token, if it is still valid.
    fn token(&self) -> Result<&AuthToken> {
        if self.inner.token.is_valid() {
            Ok(&self.inner.token)
        } else {
            Err(AuthError::SessionInvalid.into())
        }
    }

    fn client(&self) -> &ApiClient {
        &self.inner.client
    }
}

#[async_trait]
impl SessionTrait for HttpSession {
    fn url(&self) -> &InstanceUrl {
        self.inner.client.base()
    }

    fn role(&self) -> Role {
        self.inner.role
    }

    fn is_valid(&self) -> bool {
        self.inner.token.is_valid()
    }

    #[instrument(skip(self), fields(role = %self.inner.role))]
    async fn health(&self) -> Result<HealthStatus> {
        let token = self.token()?;
        let response: HealthResponse = self
            .client()
            .call(self.client().request(Method::GET, HEALTH, Some(token)))
            .await
            .map_err(|e| e.into_remote("health"))?;

        debug!(code = response.code, can_backup = response.data.can_backup, "Health report");

        Ok(HealthStatus {
            code: response.code,
            message: response.message,
            can_backup: response.data.can_backup,
        })
    }

    #[instrument(skip(self, name), fields(role = %self.inner.role, %name))]
    async fn create_backup(&self, name: &BackupName) -> Result<()> {
        info!("Creating backup");
        let token = self.token()?;
        let request = CreateBackupRequest {
            name: name.as_str(),
        };

        self.client()
            .call_no_content(
                self.client()
                    .request(Method::POST, BACKUPS, Some(token))
                    .json(&request),
            )
            .await
            .map_err(|e| e.into_remote("create backup"))
    }

    #[instrument(skip(self, name), fields(role = %self.inner.role, %name))]
    async fn download_descriptor(&self, name: &BackupName) -> Result<DownloadDescriptor> {
        let token = self.token()?;
        let response: FileTokenResponse = self
            .client()
            .call(self.client().request(Method::POST, FILES_TOKEN, Some(token)))
            .await
            .map_err(|e| e.into_remote("get file token"))?;

        let token = FileToken::new(response.token);
        let mut url = reqwest::Url::parse(&self.client().url(&backup_path(name)))
            .map_err(|e| TransferError::Read {
                message: format!("invalid download URL: {}", e),
            })?;
        url.query_pairs_mut().append_pair("token", token.as_str());

        Ok(DownloadDescriptor {
            token,
            url: url.into(),
        })
    }

    #[instrument(skip(self, descriptor), fields(role = %self.inner.role))]
    async fn open_download(&self, descriptor: &DownloadDescriptor) -> Result<ByteSource> {
        self.token()?;
        let response = self
            .client()
            .send(self.client().get_absolute(&descriptor.url))
            .await
            .map_err(|e| e.into_remote("download backup"))?;

        let content_length = response.content_length();
        debug!(?content_length, "Download started");

        let stream = response
            .bytes_stream()
            .map_err(|e| {
                Error::from(TransferError::Read {
                    message: e.to_string(),
                })
            })
            .boxed();

        Ok(ByteSource::new(content_length, stream))
    }

    #[instrument(skip(self, name), fields(role = %self.inner.role, %name))]
    async fn delete_backup(&self, name: &BackupName) -> Result<()> {
        info!("Deleting backup");
        let token = self.token()?;
        self.client()
            .call_no_content(
                self.client()
                    .request(Method::DELETE, &backup_path(name), Some(token)),
            )
            .await
            .map_err(|e| e.into_remote("delete backup"))
    }

    #[instrument(skip(self, name, bytes), fields(role = %self.inner.role, %name, size = bytes.len()))]
    async fn upload_backup(&self, name: &BackupName, bytes: Bytes) -> Result<()> {
        info!("Uploading backup");
        let token = self.token()?;

        let len = bytes.len() as u64;
        let part = Part::stream_with_length(bytes, len)
            .file_name(name.to_string())
            .mime_str(ARCHIVE_CONTENT_TYPE)
            .map_err(transport_error)?;
        let form = Form::new().part("file", part);

        self.client()
            .call_no_content(
                self.client()
                    .request(Method::POST, BACKUPS_UPLOAD, Some(token))
                    .multipart(form),
            )
            .await
            .map_err(|e| e.into_remote("upload backup"))
    }

    #[instrument(skip(self, name), fields(role = %self.inner.role, %name))]
    async fn restore_backup(&self, name: &BackupName) -> Result<()> {
        info!("Restoring backup");
        let token = self.token()?;
        self.client()
            .call_no_content(
                self.client()
                    .request(Method::POST, &restore_path(name), Some(token)),
            )
            .await
            .map_err(|e| e.into_remote("restore backup"))
    }

    async fn health_check(&self) -> Result<()> {
        // Unauthenticated, so it keeps working once the token has expired.
        self.client()
            .send(
                self.client()
                    .request(Method::GET, HEALTH, None)
                    .timeout(PROBE_TIMEOUT),
            )
            .await
            .map(drop)
            .map_err(|e| Error::Unreachable {
                message: match e {
                    CallError::Transport(t) => t.to_string(),
                    CallError::Status(detail) => detail.to_string(),
                },
            })
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("role", &self.inner.role)
            .field("url", self.inner.client.base())
            .field("token", &"[REDACTED]")
            .finish()
    }
}
