//! Upload → stage → convert → release → register.
//!
//! [`ConversionService`] sequences the components for one upload and maps
//! every failure into a [`PipelineError`]. Whatever happens after staging,
//! the staged input is released before the result is returned.

use bytes::Bytes;
use chrono::Utc;
use soundforged_av::{
    ConversionJob, ConversionOutcome, Converter, FailureReason, StagingStore, TranscoderProbe,
};
use soundforged_common::{ArtifactId, AudioFormat, Bitrate};
use std::path::{Path, PathBuf};

use crate::artifacts::{Artifact, ArtifactManager};

/// Message returned when the transcoder is not runnable.
pub const TRANSCODER_MISSING: &str = "FFmpeg is not installed on the server. Please install FFmpeg.";

/// One validated upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Bytes,
    pub format: AudioFormat,
    pub quality: Bitrate,
}

/// What a successful upload produced.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub artifact: Artifact,
    pub quality: Bitrate,
}

impl UploadReceipt {
    /// Quality as shown to clients: `"128 kbps"` or `"Uncompressed"`.
    pub fn quality_label(&self) -> String {
        self.artifact.format.quality_label(self.quality)
    }
}

/// Failure of an upload request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed or missing upload fields.
    #[error("{0}")]
    Client(String),

    /// The transcoder is not installed or not runnable.
    #[error("{}", TRANSCODER_MISSING)]
    ServiceUnavailable,

    /// The transcoder ran and failed.
    #[error("Conversion failed: {}", .reason.message())]
    Conversion { reason: FailureReason },

    /// The scratch directory could not take the upload.
    #[error("Server error: could not store upload")]
    Storage(#[source] soundforged_av::Error),

    /// Anything else.
    #[error("Server error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client(message.into())
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::Client(_) => 400,
            PipelineError::ServiceUnavailable => 500,
            PipelineError::Conversion { .. } => 500,
            PipelineError::Storage(_) => 500,
            PipelineError::Internal(_) => 500,
        }
    }
}

/// The conversion pipeline shared by all request handlers.
#[derive(Clone)]
pub struct ConversionService {
    probe: TranscoderProbe,
    staging: StagingStore,
    converter: Converter,
    artifacts: ArtifactManager,
}

impl ConversionService {
    pub fn new(
        probe: TranscoderProbe,
        staging: StagingStore,
        converter: Converter,
        artifacts: ArtifactManager,
    ) -> Self {
        Self {
            probe,
            staging,
            converter,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactManager {
        &self.artifacts
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Fail fast, before anything is staged, if the transcoder is missing.
    pub async fn ensure_transcoder(&self) -> Result<(), PipelineError> {
        if self.probe.probe().await {
            Ok(())
        } else {
            tracing::error!(
                program = %self.probe.program().display(),
                "Rejecting upload: transcoder unavailable"
            );
            Err(PipelineError::ServiceUnavailable)
        }
    }

    /// Convert one upload and register the result.
    pub async fn process(&self, request: UploadRequest) -> Result<UploadReceipt, PipelineError> {
        if request.payload.is_empty() {
            return Err(PipelineError::client("Uploaded audio is empty"));
        }

        let received_at = Utc::now();
        let staged = self.staging.stage(&request.payload).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to stage upload");
            PipelineError::Storage(e)
        })?;

        let id = ArtifactId::generate(received_at, staged.token(), request.format);
        let output = PendingOutput::new(self.staging.path_for(id.as_str()));
        let job = ConversionJob::new(
            staged.path(),
            output.path(),
            request.format.extension(),
            request.quality,
        );

        tracing::info!(
            token = %staged.token(),
            artifact = %id,
            format = %request.format,
            quality = request.quality.kbps(),
            "Converting upload"
        );
        let outcome = self.converter.convert(&job).await;

        if let Err(e) = self.staging.release(&staged).await {
            tracing::error!(token = %staged.token(), error = %e, "Failed to release staged input");
        }
        drop(staged);

        match outcome {
            ConversionOutcome::Success { size, .. } => {
                let artifact =
                    Artifact::new(id, request.format, size, Utc::now(), self.artifacts.ttl());
                self.artifacts.register(artifact.clone());
                output.disarm();
                Ok(UploadReceipt {
                    artifact,
                    quality: request.quality,
                })
            }
            // Dropping `output` discards whatever the failed run left behind.
            ConversionOutcome::Failure { reason, .. } => Err(PipelineError::Conversion { reason }),
        }
    }
}

/// Owns a conversion's output path until the artifact manager takes it.
///
/// Dropped while armed (failed run, or the request future cancelled
/// mid-conversion), it removes the file.
#[derive(Debug)]
struct PendingOutput {
    path: PathBuf,
    armed: bool,
}

impl PendingOutput {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Hand ownership over to the registered artifact.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(output = %self.path.display(), "Discarded partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(output = %self.path.display(), error = %e, "Failed to discard partial output")
            }
        }
    }
}
