//! Crash-recovery marker for in-flight result downloads.
//!
//! A single-slot store remembers the path of the temp file currently being
//! written. If the process dies mid-download the slot is still occupied on
//! the next start, and [`recover_orphaned_download`] deletes the leftover.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait RecoveryStore: Send + Sync {
    /// Path recorded by the last `acquire`, if not yet released.
    fn load(&self) -> Result<Option<PathBuf>, RecoveryError>;

    /// Record `temp_path` as the live download. Fails if the slot is taken.
    fn acquire(&self, temp_path: &Path) -> Result<(), RecoveryError>;

    /// Clear the slot. Clearing an empty slot is not an error.
    fn release(&self) -> Result<(), RecoveryError>;
}

/// Marker kept as a small text file at a fixed location.
pub struct FileRecoveryStore {
    marker_path: PathBuf,
}

impl FileRecoveryStore {
    pub fn new(marker_path: impl Into<PathBuf>) -> Self {
        Self {
            marker_path: marker_path.into(),
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn load(&self) -> Result<Option<PathBuf>, RecoveryError> {
        match std::fs::read_to_string(&self.marker_path) {
            Ok(content) => {
                let content = content.trim();
                Ok((!content.is_empty()).then(|| PathBuf::from(content)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn acquire(&self, temp_path: &Path) -> Result<(), RecoveryError> {
        if let Some(held) = self.load()? {
            return Err(RecoveryError::AlreadyHeld(held));
        }
        if let Some(parent) = self.marker_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written marker.
        let staging = self.marker_path.with_extension("tmp");
        std::fs::write(&staging, temp_path.to_string_lossy().as_bytes())?;
        std::fs::rename(&staging, &self.marker_path)?;
        Ok(())
    }

    fn release(&self) -> Result<(), RecoveryError> {
        match std::fs::remove_file(&self.marker_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, for embedding and tests.
#[derive(Default)]
pub struct MemoryRecoveryStore {
    slot: Mutex<Option<PathBuf>>,
}

impl MemoryRecoveryStore {
    pub fn holding(path: impl Into<PathBuf>) -> Self {
        Self {
            slot: Mutex::new(Some(path.into())),
        }
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn load(&self) -> Result<Option<PathBuf>, RecoveryError> {
        Ok(self.slot.lock().map_err(|_| RecoveryError::Poisoned)?.clone())
    }

    fn acquire(&self, temp_path: &Path) -> Result<(), RecoveryError> {
        let mut slot = self.slot.lock().map_err(|_| RecoveryError::Poisoned)?;
        if let Some(held) = slot.as_ref() {
            return Err(RecoveryError::AlreadyHeld(held.clone()));
        }
        *slot = Some(temp_path.to_path_buf());
        Ok(())
    }

    fn release(&self) -> Result<(), RecoveryError> {
        *self.slot.lock().map_err(|_| RecoveryError::Poisoned)? = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No marker was present
    Clean,
    /// The marker named an existing temp file, which was deleted
    RemovedOrphan(PathBuf),
    /// The marker named a file that no longer exists
    StaleMarker(PathBuf),
}

/// Startup check: delete whatever temp file an interrupted run left behind
/// and clear the marker.
pub fn recover_orphaned_download<S: RecoveryStore + ?Sized>(
    store: &S,
) -> Result<RecoveryOutcome, RecoveryError> {
    let Some(path) = store.load()? else {
        return Ok(RecoveryOutcome::Clean);
    };

    let outcome = match std::fs::remove_file(&path) {
        Ok(()) => {
            tracing::warn!(path = %path.display(), "Removed temp file left by an interrupted download");
            RecoveryOutcome::RemovedOrphan(path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Cleared stale download marker");
            RecoveryOutcome::StaleMarker(path)
        }
        Err(e) => return Err(e.into()),
    };

    store.release()?;
    Ok(outcome)
}

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("A download is already in progress: {}", .0.display())]
    AlreadyHeld(PathBuf),

    #[error("Recovery marker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recovery store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_acquire_load_release() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecoveryStore::new(dir.path().join("state").join("marker"));
        let temp = dir.path().join(".results_1.jsonl");

        assert_eq!(store.load().unwrap(), None);
        store.acquire(&temp).unwrap();
        assert_eq!(store.load().unwrap(), Some(temp.clone()));
        assert!(matches!(store.acquire(&temp), Err(RecoveryError::AlreadyHeld(_))));

        store.release().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.release().unwrap();
    }

    #[test]
    fn test_recovery_removes_orphaned_file() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join(".results_old.jsonl");
        std::fs::write(&orphan, b"{\"custom_id\":\"a.png\"}\n").unwrap();

        let store = FileRecoveryStore::new(dir.path().join("marker"));
        store.acquire(&orphan).unwrap();

        let outcome = recover_orphaned_download(&store).unwrap();
        assert_eq!(outcome, RecoveryOutcome::RemovedOrphan(orphan.clone()));
        assert!(!orphan.exists());
        assert!(!store.marker_path().exists());
    }

    #[test]
    fn test_recovery_clears_stale_marker() {
        let store = MemoryRecoveryStore::holding("/nonexistent/.results_gone.jsonl");

        let outcome = recover_orphaned_download(&store).unwrap();
        assert!(matches!(outcome, RecoveryOutcome::StaleMarker(_)));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_recovery_without_marker() {
        let store = MemoryRecoveryStore::default();
        assert_eq!(recover_orphaned_download(&store).unwrap(), RecoveryOutcome::Clean);
    }
}
