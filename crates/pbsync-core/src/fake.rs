//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio::time::Instant;

use crate::backup::{ByteSource, DownloadDescriptor, HealthStatus};
use crate::error::{ApiErrorDetail, AuthError, CredentialError, Error, RemoteOpError, TransferError};
use crate::traits::{Backend, CredentialResolver, ProgressSink, Session};
use crate::types::{BackupName, InstanceUrl, Role};
use crate::{Credentials, FileToken, Result};

const CHUNK: usize = 64 * 1024;

/// Shared, ordered log of every call made on any fake session.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Clone)]
pub struct FakeSession {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    role: Role,
    url: InstanceUrl,
    valid: AtomicBool,
    can_backup: AtomicBool,
    health_failures: AtomicU32,
    health_delay: Mutex<Duration>,
    failing: Mutex<HashSet<&'static str>>,
    break_stream_after_first_chunk: AtomicBool,
    store: Mutex<HashMap<String, Vec<u8>>>,
    probe_times: Mutex<Vec<Instant>>,
    journal: Journal,
}

impl FakeSession {
    pub fn new(role: Role) -> Self {
        Self::with_journal(role, Journal::default())
    }

    pub fn with_journal(role: Role, journal: Journal) -> Self {
        let url = InstanceUrl::new(format!("https://{}.example.com", role)).unwrap();
        Self {
            inner: Arc::new(FakeInner {
                role,
                url,
                valid: AtomicBool::new(true),
                can_backup: AtomicBool::new(true),
                health_failures: AtomicU32::new(0),
                health_delay: Mutex::new(Duration::ZERO),
                failing: Mutex::new(HashSet::new()),
                break_stream_after_first_chunk: AtomicBool::new(false),
                store: Mutex::new(HashMap::new()),
                probe_times: Mutex::new(Vec::new()),
                journal,
            }),
        }
    }

    /// Make `operation` fail from now on.
    pub fn fail(&self, operation: &'static str) {
        self.inner.failing.lock().unwrap().insert(operation);
    }

    pub fn invalidate(&self) {
        self.inner.valid.store(false, Ordering::SeqCst);
    }

    pub fn disable_backups(&self) {
        self.inner.can_backup.store(false, Ordering::SeqCst);
    }

    pub fn fail_health_checks(&self, count: u32) {
        self.inner.health_failures.store(count, Ordering::SeqCst);
    }

    pub fn delay_health_checks(&self, delay: Duration) {
        *self.inner.health_delay.lock().unwrap() = delay;
    }

    pub fn break_download_stream(&self) {
        self.inner
            .break_stream_after_first_chunk
            .store(true, Ordering::SeqCst);
    }

    pub fn store(&self, name: &str, bytes: Vec<u8>) {
        self.inner
            .store
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
    }

    pub fn stored(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.store.lock().unwrap().get(name).cloned()
    }

    pub fn probe_times(&self) -> Vec<Instant> {
        self.inner.probe_times.lock().unwrap().clone()
    }

    /// Calls made on this session only, without the role prefix.
    pub fn calls(&self) -> Vec<String> {
        let prefix = format!("{}:", self.inner.role);
        self.inner
            .journal
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    fn journal(&self, operation: &'static str) {
        self.inner
            .journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.inner.role, operation));
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        self.journal(operation);

        if !self.inner.valid.load(Ordering::SeqCst) {
            return Err(AuthError::SessionInvalid.into());
        }
        if self.inner.failing.lock().unwrap().contains(operation) {
            return Err(RemoteOpError::new(
                operation,
                ApiErrorDetail::new(400, Some(format!("{} refused", operation))),
            )
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    fn url(&self) -> &InstanceUrl {
        &self.inner.url
    }

    fn role(&self) -> Role {
        self.inner.role
    }

    fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::SeqCst)
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.record("health")?;
        Ok(HealthStatus {
            code: 200,
            message: "API is healthy.".to_string(),
            can_backup: self.inner.can_backup.load(Ordering::SeqCst),
        })
    }

    async fn create_backup(&self, name: &BackupName) -> Result<()> {
        self.record("create_backup")?;
        self.store(name.as_str(), b"PK\x03\x04fake archive".to_vec());
        Ok(())
    }

    async fn download_descriptor(&self, name: &BackupName) -> Result<DownloadDescriptor> {
        self.record("download_descriptor")?;
        Ok(DownloadDescriptor {
            token: FileToken::new("file-token"),
            url: format!("{}?token=file-token", self.inner.url.api_url(&format!("backups/{}", name))),
        })
    }

    async fn open_download(&self, descriptor: &DownloadDescriptor) -> Result<ByteSource> {
        self.record("open_download")?;
        let name = descriptor
            .url
            .split('?')
            .next()
            .and_then(|u| u.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        let bytes = self.stored(&name).ok_or_else(|| {
            RemoteOpError::new("download", ApiErrorDetail::new(404, None))
        })?;

        let total = bytes.len() as u64;
        let mut chunks: VecDeque<Result<Bytes>> = bytes
            .chunks(CHUNK)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if self.inner.break_stream_after_first_chunk.load(Ordering::SeqCst) {
            chunks.truncate(1);
            chunks.push_back(Err(TransferError::Read {
                message: "connection reset".to_string(),
            }
            .into()));
        }

        Ok(ByteSource::new(Some(total), stream::iter(chunks).boxed()))
    }

    async fn delete_backup(&self, name: &BackupName) -> Result<()> {
        self.record("delete_backup")?;
        self.inner.store.lock().unwrap().remove(name.as_str());
        Ok(())
    }

    async fn upload_backup(&self, name: &BackupName, bytes: Bytes) -> Result<()> {
        self.record("upload_backup")?;
        self.store(name.as_str(), bytes.to_vec());
        Ok(())
    }

    async fn restore_backup(&self, name: &BackupName) -> Result<()> {
        self.record("restore_backup")?;
        if self.stored(name.as_str()).is_none() {
            return Err(RemoteOpError::new("restore backup", ApiErrorDetail::new(404, None)).into());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.probe_times.lock().unwrap().push(Instant::now());
        self.journal("health_check");
        let delay = *self.inner.health_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.inner.health_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner
                .health_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Unreachable {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

/// Hands out the two prepared sessions.
pub struct FakeBackend {
    pub source: FakeSession,
    pub target: FakeSession,
    pub rejected: Mutex<HashSet<Role>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            source: FakeSession::with_journal(Role::Source, journal.clone()),
            target: FakeSession::with_journal(Role::Target, journal),
            rejected: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject(&self, role: Role) {
        self.rejected.lock().unwrap().insert(role);
    }

    pub fn journal(&self) -> Vec<String> {
        self.source.inner.journal.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    type Session = FakeSession;

    async fn authenticate(&self, role: Role, _credentials: Credentials) -> Result<FakeSession> {
        let session = match role {
            Role::Source => &self.source,
            Role::Target => &self.target,
        };
        session
            .inner
            .journal
            .lock()
            .unwrap()
            .push(format!("{}:authenticate", role));
        if self.rejected.lock().unwrap().contains(&role) {
            return Err(AuthError::Rejected(ApiErrorDetail::new(
                400,
                Some("Failed to authenticate.".to_string()),
            ))
            .into());
        }
        Ok(session.clone())
    }
}

/// Resolves fixed credentials, optionally refusing one role.
#[derive(Default)]
pub struct FakeResolver {
    pub cancelled: Option<Role>,
}

#[async_trait]
impl CredentialResolver for FakeResolver {
    async fn resolve(&self, role: Role) -> Result<Credentials> {
        if self.cancelled == Some(role) {
            return Err(CredentialError::Cancelled.into());
        }
        let url = InstanceUrl::new(format!("https://{}.example.com", role))?;
        Ok(Credentials::new(url, "admin@example.com", "secret"))
    }
}

/// Records every progress callback.
#[derive(Default)]
pub struct RecordingProgress {
    started: Mutex<Option<Option<u64>>>,
    advances: Mutex<Vec<u64>>,
    finished: AtomicBool,
    abandoned: AtomicBool,
}

impl RecordingProgress {
    pub fn started(&self) -> Option<Option<u64>> {
        *self.started.lock().unwrap()
    }

    pub fn advances(&self) -> Vec<u64> {
        self.advances.lock().unwrap().clone()
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, total: Option<u64>) {
        *self.started.lock().unwrap() = Some(total);
    }

    fn advance(&self, transferred: u64) {
        self.advances.lock().unwrap().push(transferred);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }
}
