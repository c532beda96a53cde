//! Artifact transfer between instances and local disk.
//!
//! A download is a single ordered pipe from the remote body stream into a
//! local file. It either completes (every byte written, flushed and synced)
//! or fails, in which case the partial file is removed before the error is
//! returned. Uploads read the artifact into memory and hand it to the
//! session as one body.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backup::ByteSource;
use crate::error::{Error, TransferError};
use crate::traits::{ProgressSink, Session};
use crate::types::BackupName;
use crate::Result;

/// Content type of uploaded backup archives.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

const WRITE_BUFFER: usize = 256 * 1024;

/// Fetch a fresh descriptor for `name` from `session` and download the
/// artifact to `destination`.
///
/// The destination is created before anything is requested, so a local
/// failure costs no remote calls. Returns the number of bytes written.
#[instrument(skip(session, name, progress, cancel), fields(role = %session.role(), %name))]
pub async fn download_backup<S, P>(
    session: &S,
    name: &BackupName,
    destination: &Path,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<u64>
where
    S: Session + ?Sized,
    P: ProgressSink + ?Sized,
{
    let file = open_destination(destination).await?;

    let source = async {
        let descriptor = session.download_descriptor(name).await?;
        debug!(?descriptor, "Obtained download descriptor");
        session.open_download(&descriptor).await
    }
    .await;

    match source {
        Ok(source) => download_into(source, file, destination, progress, cancel).await,
        Err(e) => {
            drop(file);
            discard_partial(destination).await;
            Err(e)
        }
    }
}

/// Stream `source` into `destination`, truncating any existing file.
///
/// The destination is opened before the first chunk is pulled. On any
/// failure, including cancellation, the partial file is removed.
pub async fn download<P>(
    source: ByteSource,
    destination: &Path,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: ProgressSink + ?Sized,
{
    let file = open_destination(destination).await?;
    download_into(source, file, destination, progress, cancel).await
}

/// Create `destination` and any missing parent directories.
async fn open_destination(destination: &Path) -> Result<File> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| local_error(parent, e))?;
    }

    Ok(File::create(destination)
        .await
        .map_err(|e| local_error(destination, e))?)
}

async fn download_into<P>(
    source: ByteSource,
    file: File,
    destination: &Path,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: ProgressSink + ?Sized,
{
    progress.start(source.content_length);

    match copy_to_file(source, file, destination, progress, cancel).await {
        Ok(written) => {
            progress.finish();
            info!(bytes = written, path = %destination.display(), "Download complete");
            Ok(written)
        }
        Err(e) => {
            progress.abandon();
            discard_partial(destination).await;
            Err(e)
        }
    }
}

async fn copy_to_file<P>(
    source: ByteSource,
    file: File,
    destination: &Path,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: ProgressSink + ?Sized,
{
    let ByteSource {
        content_length,
        mut stream,
    } = source;

    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);
    let mut transferred: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            next = stream.next() => next,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| local_error(destination, e))?;

        transferred += chunk.len() as u64;
        progress.advance(transferred);
    }

    writer
        .flush()
        .await
        .map_err(|e| local_error(destination, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| local_error(destination, e))?;

    if let Some(expected) = content_length
        && transferred < expected
    {
        return Err(TransferError::Truncated {
            expected,
            received: transferred,
        }
        .into());
    }

    Ok(transferred)
}

/// Read the artifact at `source` and upload it to `session` as `name`.
///
/// Returns the number of bytes uploaded.
#[instrument(skip(session, name), fields(role = %session.role(), %name))]
pub async fn upload<S>(session: &S, source: &Path, name: &BackupName) -> Result<u64>
where
    S: Session + ?Sized,
{
    let bytes = fs::read(source)
        .await
        .map_err(|e| local_error(source, e))?;
    let len = bytes.len() as u64;

    debug!(bytes = len, "Uploading artifact");
    session.upload_backup(name, Bytes::from(bytes)).await?;

    info!(bytes = len, "Upload complete");
    Ok(len)
}

/// Remove a local artifact.
pub async fn remove_local(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .await
        .map_err(|e| Error::from(local_error(path, e)))
}

async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
    }
}

fn local_error(path: &Path, source: io::Error) -> TransferError {
    TransferError::Local {
        path: PathBuf::from(path),
        source,
    }
}
