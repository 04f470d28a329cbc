//! Staging store for incoming uploads.
//!
//! Uploads are written flat into the shared scratch directory under a fresh
//! random token (`temp_<token>.<ext>`). The token makes every path private
//! to one request, so the store needs no locking.

use soundforged_common::paths::staged_input_name;
use soundforged_common::StagingToken;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Attempts at finding an unused staging name before giving up.
const MAX_NAME_ATTEMPTS: usize = 4;

/// An uploaded payload persisted to the scratch directory.
///
/// Owned by exactly one request. [`StagingStore::release`] is the normal way
/// to delete it; if the owning request is dropped before that happens, the
/// backing file is removed on drop.
#[derive(Debug)]
pub struct StagedInput {
    token: StagingToken,
    path: PathBuf,
    size: u64,
}

impl StagedInput {
    /// The random token naming this input.
    pub fn token(&self) -> &StagingToken {
        &self.token
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes staged.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::warn!(token = %self.token, "Staged input dropped without release; removed")
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(token = %self.token, error = %e, "Failed to remove dropped staged input")
            }
        }
    }
}

/// Manages the scratch directory shared by staged inputs and artifacts.
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
    extension: String,
}

impl StagingStore {
    /// Open (creating if needed) a scratch directory.
    ///
    /// `extension` is the container extension given to staged inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or non-alphanumeric
    /// extension and [`Error::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        let extension = extension.into();

        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "invalid staging extension: {extension:?}"
            )));
        }

        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir, extension })
    }

    /// The scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file named `name` inside the scratch directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write `bytes` to a new uniquely named file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory is unwritable or the disk is
    /// full. A partially written file is removed before returning.
    pub async fn stage(&self, bytes: &[u8]) -> Result<StagedInput> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let token = StagingToken::new();
            let path = self.path_for(&staged_input_name(&token, &self.extension));

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(token = %token, "Staging name collision; retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            // From here on the guard owns the file and removes it on error.
            let staged = StagedInput {
                token,
                path,
                size: bytes.len() as u64,
            };

            file.write_all(bytes).await?;
            file.flush().await?;

            tracing::info!(
                token = %staged.token,
                size_bytes = staged.size,
                path = %staged.path.display(),
                "Staged upload"
            );
            return Ok(staged);
        }

        Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find an unused staging name",
        )))
    }

    /// Delete a staged input's backing file.
    ///
    /// Idempotent: an already-absent file is logged at warn level and
    /// reported as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be removed.
    pub async fn release(&self, input: &StagedInput) -> Result<bool> {
        match tokio::fs::remove_file(&input.path).await {
            Ok(()) => {
                tracing::info!(token = %input.token, "Released staged input");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(token = %input.token, "Staged input already absent on release");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current contents of the scratch directory, sorted by name.
    ///
    /// For diagnostics only; lifecycle decisions never depend on it.
    pub async fn sweep(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, StagingStore) {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::open(dir.path().join("scratch"), "webm").unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_stage_writes_bytes() {
        let (_dir, store) = store();
        let staged = store.stage(b"webm bytes").await.unwrap();

        assert!(staged.path().starts_with(store.dir()));
        assert_eq!(staged.size(), 10);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"webm bytes");

        let name = staged.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("temp_{}.webm", staged.token().short()));
    }

    #[tokio::test]
    async fn test_stage_unique_names() {
        let (_dir, store) = store();
        let a = store.stage(b"a").await.unwrap();
        let b = store.stage(b"b").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(store.sweep().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (_dir, store) = store();
        let staged = store.stage(b"data").await.unwrap();

        assert!(store.release(&staged).await.unwrap());
        assert!(!staged.path().exists());
        assert!(!store.release(&staged).await.unwrap());
        assert!(store.sweep().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_input() {
        let (_dir, store) = store();
        let staged = store.stage(b"data").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_sweep_sorted() {
        let (_dir, store) = store();
        std::fs::write(store.path_for("b.txt"), b"").unwrap();
        std::fs::write(store.path_for("a.txt"), b"").unwrap();
        assert_eq!(store.sweep().await.unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_open_rejects_bad_extension() {
        let dir = TempDir::new().unwrap();
        assert!(StagingStore::open(dir.path(), "").is_err());
        assert!(StagingStore::open(dir.path(), "../x").is_err());
        assert!(StagingStore::open(dir.path(), "web m").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stage_unwritable_dir_fails() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        std::fs::set_permissions(store.dir(), std::fs::Permissions::from_mode(0o500)).unwrap();

        let result = store.stage(b"data").await;

        std::fs::set_permissions(store.dir(), std::fs::Permissions::from_mode(0o700)).unwrap();
        // Root ignores directory permissions.
        if result.is_ok() {
            return;
        }
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
