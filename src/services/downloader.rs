//! Streams a batch response file to a local temp file under the recovery
//! marker.

use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

use crate::services::backend::FileStore;
use crate::services::gemini::GeminiError;
use crate::services::recovery::{RecoveryError, RecoveryStore};

/// Default write buffer: one flush per MiB keeps peak memory independent of
/// the response size.
pub const DEFAULT_CHUNK_BYTES: usize = 1024 * 1024;

/// A downloaded response file plus the marker that points at it.
///
/// Owning this value means owning the temp file. Dropping it (or calling
/// [`TempResultFile::discard`]) deletes the file and clears the marker.
pub struct TempResultFile<'s, S: RecoveryStore + ?Sized> {
    path: PathBuf,
    bytes: u64,
    store: &'s S,
    released: bool,
}

impl<'s, S: RecoveryStore + ?Sized> TempResultFile<'s, S> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Delete the temp file and clear the marker, reporting failures.
    pub fn discard(mut self) -> Result<(), RecoveryError> {
        self.released = true;
        remove_if_present(&self.path)?;
        self.store.release()
    }
}

impl<S: RecoveryStore + ?Sized> Drop for TempResultFile<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to remove temp result file");
        }
        if let Err(e) = self.store.release() {
            tracing::error!(error = %e, "Failed to clear download marker");
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Download `file_name` into a fresh temp file under `temp_dir`.
///
/// The marker is recorded before the first byte is requested. On any error
/// the partial file and the marker are removed before the error is returned.
pub async fn download_results<'s, B, S>(
    backend: &B,
    store: &'s S,
    file_name: &str,
    temp_dir: &Path,
    chunk_bytes: usize,
) -> Result<TempResultFile<'s, S>, DownloadError>
where
    B: FileStore,
    S: RecoveryStore + ?Sized,
{
    tokio::fs::create_dir_all(temp_dir).await?;
    let path = temp_dir.join(format!(".results_{}.jsonl", Uuid::new_v4()));

    store.acquire(&path)?;
    let mut temp = TempResultFile {
        path,
        bytes: 0,
        store,
        released: false,
    };

    let file = tokio::fs::File::create(&temp.path).await?;
    let mut writer = BufWriter::with_capacity(chunk_bytes.max(8 * 1024), file);

    tracing::info!(file = %file_name, temp = %temp.path.display(), "Downloading results");
    temp.bytes = backend.download_file(file_name, &mut writer).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    tracing::info!(file = %file_name, bytes = temp.bytes, "Download complete");

    Ok(temp)
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Download failed: {0}")]
    Transport(#[from] GeminiError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Failed to write temp result file: {0}")]
    Io(#[from] std::io::Error),
}
