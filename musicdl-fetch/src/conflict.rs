//! Destination conflict handling and atomic writes.
//!
//! Every write goes through a temporary file in the destination directory
//! followed by a rename, so a destination is either untouched or holds the
//! complete new content. Under `ERROR` and `IGNORE` the rename refuses to
//! replace an existing file.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use musicdl_core::{ConflictDecision, MAX_FILE_NAME_BYTES};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::error::ConflictError;

/// Temporary file prefix inside the destination directory.
const TEMP_PREFIX: &str = ".musicdl-";

/// What the resolver decided for a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Path is free; write it.
    Create,
    /// Path exists and will be replaced.
    Replace,
    /// Path exists and the track is skipped.
    Skip,
}

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content is at the destination.
    Written,
    /// The destination appeared before the rename and was left untouched.
    Skipped,
}

/// Applies one [`ConflictDecision`] to every destination of an invocation.
#[derive(Debug)]
pub struct ConflictResolver {
    decision: ConflictDecision,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConflictResolver {
    /// Creates a resolver for `decision`.
    pub fn new(decision: ConflictDecision) -> Self {
        Self {
            decision,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The active decision.
    pub fn decision(&self) -> ConflictDecision {
        self.decision
    }

    /// Serializes work on one destination path.
    ///
    /// Hold the guard across [`check`](Self::check) and [`write`](Self::write).
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }

    /// Decides what to do with `path` before any download happens.
    ///
    /// # Errors
    ///
    /// [`ConflictError::Exists`] if the path exists under `ERROR`;
    /// [`ConflictError::NameTooLong`] if the file name cannot be created.
    pub fn check(&self, path: &Path) -> Result<Placement, ConflictError> {
        if path
            .file_name()
            .is_some_and(|name| name.len() > MAX_FILE_NAME_BYTES)
        {
            return Err(ConflictError::NameTooLong(path.to_path_buf()));
        }
        if !path.try_exists()? {
            return Ok(Placement::Create);
        }

        match self.decision {
            ConflictDecision::Error => Err(ConflictError::Exists(path.to_path_buf())),
            ConflictDecision::Ignore => Ok(Placement::Skip),
            ConflictDecision::Overwrite => Ok(Placement::Replace),
        }
    }

    /// Writes `content` to `path` through a temporary file and a rename.
    ///
    /// # Errors
    ///
    /// [`ConflictError::Exists`] if another writer created the path in the
    /// meantime under `ERROR`; [`ConflictError::Io`] on write failures. The
    /// temporary file never survives a failure.
    pub async fn write(&self, path: &Path, content: Vec<u8>) -> Result<WriteOutcome, ConflictError> {
        let path = path.to_path_buf();
        let decision = self.decision;

        tokio::task::spawn_blocking(move || write_atomic(&path, &content, decision))
            .await
            .map_err(|e| ConflictError::Io(std::io::Error::other(e)))?
    }
}

fn write_atomic(
    path: &Path,
    content: &[u8],
    decision: ConflictDecision,
) -> Result<WriteOutcome, ConflictError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".part")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    let persisted = match decision {
        ConflictDecision::Overwrite => temp.persist(path),
        ConflictDecision::Error | ConflictDecision::Ignore => temp.persist_noclobber(path),
    };

    match persisted {
        Ok(_) => {
            debug!(path = %path.display(), bytes = content.len(), "File written");
            Ok(WriteOutcome::Written)
        }
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            // `e.file` is dropped here, removing the temporary file.
            if decision == ConflictDecision::Ignore {
                debug!(path = %path.display(), "Destination appeared before rename, skipping");
                Ok(WriteOutcome::Skipped)
            } else {
                Err(ConflictError::Exists(path.to_path_buf()))
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e.error, "Rename failed");
            Err(ConflictError::Io(e.error))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    #[tokio::test]
    async fn test_create_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");

        for decision in ConflictDecision::all() {
            let resolver = ConflictResolver::new(*decision);
            assert_eq!(resolver.check(&path).unwrap(), Placement::Create);
        }

        let resolver = ConflictResolver::new(ConflictDecision::Error);
        assert_eq!(
            resolver.write(&path, b"new".to_vec()).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_error_never_writes_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"old").unwrap();

        let resolver = ConflictResolver::new(ConflictDecision::Error);
        assert!(matches!(resolver.check(&path), Err(ConflictError::Exists(_))));
        assert!(matches!(
            resolver.write(&path, b"new".to_vec()).await,
            Err(ConflictError::Exists(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_ignore_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"old").unwrap();

        let resolver = ConflictResolver::new(ConflictDecision::Ignore);
        assert_eq!(resolver.check(&path).unwrap(), Placement::Skip);
        assert_eq!(
            resolver.write(&path, b"new".to_vec()).await.unwrap(),
            WriteOutcome::Skipped
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"old content that is longer").unwrap();

        let resolver = ConflictResolver::new(ConflictDecision::Overwrite);
        assert_eq!(resolver.check(&path).unwrap(), Placement::Replace);
        assert_eq!(
            resolver.write(&path, b"new".to_vec()).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_check_rejects_overlong_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConflictResolver::new(ConflictDecision::Overwrite);

        let path = dir.path().join(format!("{}.mp3", "a".repeat(MAX_FILE_NAME_BYTES)));
        assert!(matches!(
            resolver.check(&path),
            Err(ConflictError::NameTooLong(_))
        ));

        let path = dir.path().join(format!("{}.mp3", "a".repeat(MAX_FILE_NAME_BYTES - 4)));
        assert_eq!(resolver.check(&path).unwrap(), Placement::Create);
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.mp3");

        let resolver = ConflictResolver::new(ConflictDecision::Overwrite);
        assert!(matches!(
            resolver.write(&path, b"new".to_vec()).await,
            Err(ConflictError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_path() {
        let resolver = Arc::new(ConflictResolver::new(ConflictDecision::Error));
        let path = PathBuf::from("/tmp/same.mp3");

        let guard = resolver.lock(&path).await;
        let contender = {
            let resolver = Arc::clone(&resolver);
            let path = path.clone();
            tokio::spawn(async move {
                let _guard = resolver.lock(&path).await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();

        let _other = resolver.lock(Path::new("/tmp/other.mp3")).await;
    }
}
