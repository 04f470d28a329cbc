use serde::{Deserialize, Serialize};
use soundforged_av::{resolve_tool_path, ConverterSettings, TranscoderProbe};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served as a fallback (the recorder page lives here)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Maximum request body size for uploads, in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_upload_mb() -> u64 {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Flat scratch directory for staged uploads and artifacts
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Container extension given to staged uploads
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Seconds an artifact stays downloadable after creation
    #[serde(default = "default_artifact_ttl")]
    pub artifact_ttl_secs: u64,

    /// Delete leftover temp_/recording_ files from a previous run at startup
    #[serde(default = "default_purge_on_startup")]
    pub purge_on_startup: bool,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("static/temp")
}
fn default_input_extension() -> String {
    "webm".to_string()
}
fn default_artifact_ttl() -> u64 {
    300
}
fn default_purge_on_startup() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            input_extension: default_input_extension(),
            artifact_ttl_secs: default_artifact_ttl(),
            purge_on_startup: default_purge_on_startup(),
        }
    }
}

impl StorageConfig {
    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscoderConfig {
    /// Explicit ffmpeg executable (default: looked up on PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Hard limit for one conversion, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Limit for the availability probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u8,

    /// Bitrate (kbps) used when a request does not specify one
    #[serde(default = "default_quality")]
    pub default_quality: u32,

    /// Characters of transcoder stderr kept in failure logs
    #[serde(default = "default_diagnostic_limit")]
    pub diagnostic_limit: usize,
}

fn default_timeout() -> u64 {
    120
}
fn default_probe_timeout() -> u64 {
    10
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_channels() -> u8 {
    2
}
fn default_quality() -> u32 {
    192
}
fn default_diagnostic_limit() -> usize {
    2000
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            default_quality: default_quality(),
            diagnostic_limit: default_diagnostic_limit(),
        }
    }
}

impl TranscoderConfig {
    /// Resolved ffmpeg executable.
    pub fn program(&self) -> PathBuf {
        resolve_tool_path("ffmpeg", self.ffmpeg_path.as_deref())
    }

    pub fn probe(&self) -> TranscoderProbe {
        TranscoderProbe::new(self.program())
            .with_timeout(Duration::from_secs(self.probe_timeout_secs))
    }

    pub fn converter_settings(&self) -> ConverterSettings {
        ConverterSettings {
            program: self.program(),
            timeout: Duration::from_secs(self.timeout_secs),
            sample_rate: self.sample_rate,
            channels: self.channels,
            diagnostic_limit: self.diagnostic_limit,
        }
    }
}
