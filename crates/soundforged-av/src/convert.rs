//! Audio conversion through the external transcoder.
//!
//! [`Converter::convert`] owns the command contract for both output profiles
//! and classifies every way a run can end into a [`ConversionOutcome`]. It
//! never retries: staged inputs are single-use, so a failure goes straight
//! back to the caller.

use serde::Serialize;
use soundforged_common::{AudioFormat, Bitrate};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, ToolCommand};

/// Sample rate written by both profiles.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Channel count written by both profiles.
pub const DEFAULT_CHANNELS: u8 = 2;

/// Hard wall-clock limit for one conversion.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Characters of transcoder stderr kept in a failure.
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 2000;

/// Encoder profile for an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioProfile {
    /// LAME MP3 at the requested bitrate.
    Mp3,
    /// Signed 16-bit little-endian PCM in a WAV container.
    Wav,
}

impl AudioProfile {
    /// Profile for an output format.
    pub fn for_format(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Mp3 => AudioProfile::Mp3,
            AudioFormat::Wav => AudioProfile::Wav,
        }
    }

    /// Get the ffmpeg codec name.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            AudioProfile::Mp3 => "libmp3lame",
            AudioProfile::Wav => "pcm_s16le",
        }
    }

    /// Whether the profile takes a bitrate.
    pub fn uses_bitrate(&self) -> bool {
        matches!(self, AudioProfile::Mp3)
    }
}

/// Why a conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// The staged input was not on disk.
    MissingInput,
    /// The job named a format without a command contract.
    UnsupportedFormat,
    /// The transcoder ran past the timeout and was killed.
    ProcessTimeout,
    /// The transcoder binary could not be located.
    TranscoderAbsent,
    /// Non-zero exit, missing output, or any other failure.
    ProcessError,
}

impl FailureReason {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::MissingInput => "missing-input",
            FailureReason::UnsupportedFormat => "unsupported-format",
            FailureReason::ProcessTimeout => "process-timeout",
            FailureReason::TranscoderAbsent => "transcoder-absent",
            FailureReason::ProcessError => "process-error",
        }
    }

    /// Short reason safe to show to clients.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::MissingInput => "Input file not found",
            FailureReason::UnsupportedFormat => "Unsupported format",
            FailureReason::ProcessTimeout => "Conversion timeout",
            FailureReason::TranscoderAbsent => "FFmpeg not found. Please install FFmpeg.",
            FailureReason::ProcessError => "FFmpeg error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One conversion request. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    input: PathBuf,
    output: PathBuf,
    format: String,
    quality: Bitrate,
}

impl ConversionJob {
    /// Build a job.
    ///
    /// `format` is kept as given; the converter decides whether it has a
    /// command contract for it.
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        format: impl Into<String>,
        quality: Bitrate,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: format.into(),
            quality,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn quality(&self) -> Bitrate {
        self.quality
    }
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The transcoder exited cleanly and the output file exists.
    Success {
        /// Path of the produced file.
        output: PathBuf,
        /// Size of the produced file in bytes.
        size: u64,
    },
    /// The conversion did not produce a usable file.
    Failure {
        /// Classified reason.
        reason: FailureReason,
        /// Truncated transcoder diagnostic; for logs, not for clients.
        diagnostic: String,
    },
}

impl ConversionOutcome {
    fn failure(reason: FailureReason, diagnostic: impl Into<String>) -> Self {
        Self::Failure {
            reason,
            diagnostic: diagnostic.into(),
        }
    }

    /// Whether the conversion succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Fixed parameters of the conversion command contract.
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// Transcoder executable.
    pub program: PathBuf,
    /// Hard wall-clock limit per run.
    pub timeout: Duration,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u8,
    /// Characters of stderr kept in a failure diagnostic.
    pub diagnostic_limit: usize,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            timeout: DEFAULT_CONVERSION_TIMEOUT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            diagnostic_limit: DEFAULT_DIAGNOSTIC_LIMIT,
        }
    }
}

/// Runs conversion jobs against the external transcoder.
#[derive(Debug, Clone)]
pub struct Converter {
    settings: ConverterSettings,
}

impl Converter {
    pub fn new(settings: ConverterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Build the transcoder argument vector for a job.
    pub fn build_args(&self, job: &ConversionJob, profile: AudioProfile) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            job.input.to_string_lossy().to_string(),
            "-codec:a".to_string(),
            profile.ffmpeg_codec().to_string(),
        ];

        if profile.uses_bitrate() {
            args.push("-b:a".to_string());
            args.push(job.quality.ffmpeg_value());
        }

        args.extend([
            "-ar".to_string(),
            self.settings.sample_rate.to_string(),
            "-ac".to_string(),
            self.settings.channels.to_string(),
            // Overwrite the output if it exists.
            "-y".to_string(),
            job.output.to_string_lossy().to_string(),
        ]);

        args
    }

    /// Run a conversion job.
    ///
    /// Success requires both a zero exit status and an output file on disk
    /// afterwards. A timed-out run may leave a partial output behind; the
    /// caller discards it.
    pub async fn convert(&self, job: &ConversionJob) -> ConversionOutcome {
        let outcome = self.run(job).await;

        match &outcome {
            ConversionOutcome::Success { size, .. } => {
                tracing::info!(
                    output = %job.output.display(),
                    format = %job.format,
                    size_bytes = size,
                    "Conversion successful"
                );
            }
            ConversionOutcome::Failure { reason, diagnostic } => {
                tracing::error!(
                    input = %job.input.display(),
                    format = %job.format,
                    reason = %reason,
                    diagnostic = %diagnostic,
                    "Conversion failed"
                );
            }
        }

        outcome
    }

    async fn run(&self, job: &ConversionJob) -> ConversionOutcome {
        if !tokio::fs::try_exists(&job.input).await.unwrap_or(false) {
            return ConversionOutcome::failure(
                FailureReason::MissingInput,
                Error::file_not_found(&job.input).to_string(),
            );
        }

        let profile = match job.format.parse::<AudioFormat>() {
            Ok(format) => AudioProfile::for_format(format),
            Err(e) => return ConversionOutcome::failure(FailureReason::UnsupportedFormat, e.to_string()),
        };

        let args = self.build_args(job, profile);
        tracing::debug!(program = %self.settings.program.display(), ?args, "Running transcoder");

        let mut cmd = ToolCommand::new(self.settings.program.clone());
        cmd.args(args).timeout(self.settings.timeout);

        let limit = self.settings.diagnostic_limit;
        match cmd.execute().await {
            Ok(_) => {}
            Err(e @ Error::Timeout { .. }) => {
                return ConversionOutcome::failure(FailureReason::ProcessTimeout, e.to_string())
            }
            Err(e @ Error::ToolNotFound { .. }) => {
                return ConversionOutcome::failure(FailureReason::TranscoderAbsent, e.to_string())
            }
            Err(e) => {
                return ConversionOutcome::failure(
                    FailureReason::ProcessError,
                    truncate_diagnostic(&e.to_string(), limit),
                )
            }
        }

        // The exit status alone is not trusted.
        match tokio::fs::metadata(&job.output).await {
            Ok(meta) if meta.is_file() => ConversionOutcome::Success {
                output: job.output.clone(),
                size: meta.len(),
            },
            _ => ConversionOutcome::failure(
                FailureReason::ProcessError,
                format!(
                    "transcoder exited successfully but produced no output at {}",
                    job.output.display()
                ),
            ),
        }
    }
}

/// Cut a diagnostic down to `limit` characters.
pub fn truncate_diagnostic(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
