//! Artifact lifecycle management.
//!
//! Every converted file is registered here with a fixed expiry deadline
//! (creation time + TTL) and a detached timer task that deletes it when the
//! deadline passes, whether or not anyone downloaded it. Downloads are
//! unlimited until then and never re-arm the timer.
//!
//! The file on disk is the authority: metadata may briefly outlive a deleted
//! file, but [`ArtifactManager::resolve`] opens the file directly and treats
//! any failure as "not found".

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use soundforged_av::{StagingStore, TranscoderProbe};
use soundforged_common::paths::is_managed_file;
use soundforged_common::{ArtifactId, AudioFormat};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Wait before retrying a failed expiry delete.
const EXPIRY_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Deleted,
    Absent,
    Failed,
}

/// A converted file available for download until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub format: AudioFormat,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        id: ArtifactId,
        format: AudioFormat,
        size: u64,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(300));
        Self {
            id,
            format,
            size,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Relative URL clients download this artifact from.
    pub fn download_url(&self) -> String {
        format!("/download/{}", self.id)
    }
}

/// The identifier is unknown, expired, malformed, or its file is gone.
#[derive(Debug, thiserror::Error)]
#[error("File not found")]
pub struct ArtifactNotFound;

/// An open artifact ready to be streamed.
#[derive(Debug)]
pub struct ResolvedArtifact {
    pub artifact: Artifact,
    pub file: tokio::fs::File,
    /// Size of the file as opened.
    pub size: u64,
}

/// Operational snapshot for the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub transcoder_available: bool,
    pub transcoder_version: Option<String>,
    pub scratch_dir: PathBuf,
    pub scratch_files: Vec<String>,
    pub active_artifacts: usize,
    pub timestamp: DateTime<Utc>,
}

struct Inner {
    store: StagingStore,
    probe: TranscoderProbe,
    ttl: Duration,
    artifacts: DashMap<ArtifactId, Artifact>,
    shutdown: CancellationToken,
    timers: TaskTracker,
}

/// Thread-safe registry of live artifacts and their expiry timers.
#[derive(Clone)]
pub struct ArtifactManager {
    inner: Arc<Inner>,
}

impl ArtifactManager {
    /// Create a manager for the artifacts in `store`'s scratch directory.
    pub fn new(store: StagingStore, probe: TranscoderProbe, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                probe,
                ttl,
                artifacts: DashMap::new(),
                shutdown: CancellationToken::new(),
                timers: TaskTracker::new(),
            }),
        }
    }

    /// Expiry window applied to new artifacts.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn dir(&self) -> &Path {
        self.inner.store.dir()
    }

    /// Record an artifact and arm its expiry timer.
    ///
    /// The timer is detached: the caller does not wait for it.
    pub fn register(&self, artifact: Artifact) {
        let id = artifact.id.clone();
        let delay = (artifact.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        tracing::info!(
            artifact = %id,
            size_bytes = artifact.size,
            expires_at = %artifact.expires_at,
            "Registered artifact"
        );
        self.inner.artifacts.insert(id.clone(), artifact);

        if self.inner.shutdown.is_cancelled() {
            // No timer would ever fire; delete now rather than leak.
            let manager = self.clone();
            tokio::spawn(async move {
                manager.expire(&id).await;
            });
            return;
        }

        let manager = self.clone();
        let shutdown = self.inner.shutdown.clone();
        self.inner.timers.spawn(async move {
            let mut wait = delay;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.cancelled() => return,
                }
                if manager.remove(&id).await != Removal::Failed {
                    return;
                }
                wait = EXPIRY_RETRY_DELAY;
            }
        });
    }

    /// Delete an artifact's file and forget it.
    ///
    /// Idempotent: returns `false` without error when the file was already
    /// gone. When the delete itself fails the artifact stays registered, so
    /// its timer or [`shutdown`](Self::shutdown) tries again.
    pub async fn expire(&self, id: &ArtifactId) -> bool {
        self.remove(id).await == Removal::Deleted
    }

    async fn remove(&self, id: &ArtifactId) -> Removal {
        let path = self.inner.store.path_for(id.as_str());

        let removal = match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(artifact = %id, "Expired artifact deleted");
                Removal::Deleted
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(artifact = %id, "Expired artifact already absent");
                Removal::Absent
            }
            Err(e) => {
                tracing::error!(
                    artifact = %id,
                    error = %e,
                    retry_secs = EXPIRY_RETRY_DELAY.as_secs(),
                    "Failed to delete expired artifact; keeping it registered"
                );
                return Removal::Failed;
            }
        };

        self.inner.artifacts.remove(id);
        removal
    }

    /// Open an artifact for download.
    ///
    /// Malformed identifiers (path separators, parent references) are
    /// reported exactly like unknown or expired ones.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedArtifact, ArtifactNotFound> {
        let id = ArtifactId::parse(identifier).map_err(|_| {
            tracing::debug!(identifier = %identifier, "Rejected malformed artifact identifier");
            ArtifactNotFound
        })?;

        let artifact = self
            .inner
            .artifacts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ArtifactNotFound)?;

        if artifact.is_expired_at(Utc::now()) {
            return Err(ArtifactNotFound);
        }

        // Single authoritative check: open, don't stat-then-open.
        let file = tokio::fs::File::open(self.inner.store.path_for(id.as_str()))
            .await
            .map_err(|_| ArtifactNotFound)?;
        let size = file
            .metadata()
            .await
            .map(|m| m.len())
            .unwrap_or(artifact.size);

        Ok(ResolvedArtifact {
            artifact,
            file,
            size,
        })
    }

    /// Look up a live artifact's metadata.
    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        self.inner.artifacts.get(id).map(|entry| entry.value().clone())
    }

    /// Number of registered, not yet expired artifacts.
    pub fn active_count(&self) -> usize {
        self.inner.artifacts.len()
    }

    /// Diagnostic snapshot of the scratch directory and transcoder.
    pub async fn status(&self) -> StatusSnapshot {
        let tool = self.inner.probe.info().await;
        let scratch_files = self.inner.store.sweep().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list scratch directory");
            Vec::new()
        });

        StatusSnapshot {
            transcoder_available: tool.available,
            transcoder_version: tool.version,
            scratch_dir: self.inner.store.dir().to_path_buf(),
            scratch_files,
            active_artifacts: self.active_count(),
            timestamp: Utc::now(),
        }
    }

    /// Delete leftover managed files that no artifact owns.
    ///
    /// No index survives a restart, so files from a previous run would
    /// otherwise never be deleted.
    pub async fn purge_stale(&self) -> usize {
        let names = match self.inner.store.sweep().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list scratch directory for purge");
                return 0;
            }
        };

        let mut purged = 0;
        for name in names.iter().filter(|n| is_managed_file(n)) {
            if let Ok(id) = ArtifactId::parse(name) {
                if self.inner.artifacts.contains_key(&id) {
                    continue;
                }
            }
            match tokio::fs::remove_file(self.inner.store.path_for(name)).await {
                Ok(()) => purged += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(file = %name, error = %e, "Failed to purge stale file"),
            }
        }

        if purged > 0 {
            tracing::info!(purged, "Purged stale files from scratch directory");
        }
        purged
    }

    /// Cancel all pending timers and delete every remaining artifact.
    ///
    /// Returns the number of artifacts deleted.
    pub async fn shutdown(&self) -> usize {
        self.inner.shutdown.cancel();
        self.inner.timers.close();
        self.inner.timers.wait().await;

        let ids: Vec<ArtifactId> = self
            .inner
            .artifacts
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut deleted = 0;
        for id in &ids {
            if self.expire(id).await {
                deleted += 1;
            }
        }

        tracing::info!(deleted, "Artifact manager shut down");
        deleted
    }
}
