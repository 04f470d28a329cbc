mod types;

pub use types::*;

use anyhow::{Context, Result};
use soundforged_common::Bitrate;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./soundforged.toml",
        "~/.config/soundforged/config.toml",
        "/etc/soundforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Apply `--host`/`--port` on top of the loaded file; absent flags keep the
/// file's values.
pub fn apply_server_overrides(config: &mut Config, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }
    if config.server.max_upload_mb == 0 {
        anyhow::bail!("server.max_upload_mb must be greater than 0");
    }

    let ext = &config.storage.input_extension;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!("storage.input_extension must be alphanumeric, got {:?}", ext);
    }
    if config.storage.artifact_ttl_secs == 0 {
        anyhow::bail!("storage.artifact_ttl_secs must be greater than 0");
    }

    let transcoder = &config.transcoder;
    if transcoder.timeout_secs == 0 || transcoder.probe_timeout_secs == 0 {
        anyhow::bail!("transcoder timeouts must be greater than 0");
    }
    if transcoder.sample_rate == 0 || transcoder.channels == 0 {
        anyhow::bail!("transcoder.sample_rate and transcoder.channels must be greater than 0");
    }
    Bitrate::new(transcoder.default_quality).with_context(|| {
        format!(
            "transcoder.default_quality must be between {} and {} kbps",
            Bitrate::MIN_KBPS,
            Bitrate::MAX_KBPS
        )
    })?;

    if let Some(ref path) = transcoder.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg_path does not exist: {:?}", path);
        }
    }

    Ok(())
}
