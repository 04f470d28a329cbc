//! External tool detection and the transcoder availability probe.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, ToolCommand};

/// Default probe timeout: 10 seconds.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool started and exited successfully.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path the tool was invoked through.
    pub path: Option<PathBuf>,
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
///
/// A configured path is used verbatim, even if it does not exist, so that a
/// misconfigured deployment reports the transcoder as absent instead of
/// silently running whatever ffmpeg happens to be on `PATH`. Without one, the
/// bare name is returned when `which` finds nothing and the spawn fails later.
pub fn resolve_tool_path(name: &str, configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }

    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Checks whether the transcoder binary is present and runnable.
///
/// # Example
///
/// ```no_run
/// use soundforged_av::TranscoderProbe;
/// use std::path::PathBuf;
///
/// # async fn example() {
/// let probe = TranscoderProbe::new(PathBuf::from("ffmpeg"));
/// if !probe.probe().await {
///     eprintln!("ffmpeg is not installed");
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TranscoderProbe {
    program: PathBuf,
    version_arg: String,
    timeout: Duration,
}

impl TranscoderProbe {
    /// Probe `program` with ffmpeg's `-version` argument.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            version_arg: "-version".to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Use a different introspection argument.
    pub fn with_version_arg(mut self, arg: impl Into<String>) -> Self {
        self.version_arg = arg.into();
        self
    }

    /// Bound how long the probe may run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the probed program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the transcoder starts and exits with a success code.
    ///
    /// Never fails: a missing binary, a permission error, a timeout, or a
    /// non-zero exit all yield `false`.
    pub async fn probe(&self) -> bool {
        self.info().await.available
    }

    /// Run the probe and collect version information.
    pub async fn info(&self) -> ToolInfo {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.arg(self.version_arg.clone()).timeout(self.timeout);
        let name = cmd.program_name();

        match cmd.execute().await {
            Ok(output) => ToolInfo {
                name,
                available: true,
                version: output.stdout.lines().next().map(|s| s.to_string()),
                path: Some(self.program.clone()),
            },
            Err(e) => {
                match e {
                    Error::ToolNotFound { .. } => {
                        tracing::warn!(program = %self.program.display(), "Transcoder not found")
                    }
                    other => {
                        tracing::warn!(program = %self.program.display(), error = %other, "Transcoder probe failed")
                    }
                }
                ToolInfo {
                    name,
                    available: false,
                    version: None,
                    path: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_not_found() {
        let probe = TranscoderProbe::new(PathBuf::from("nonexistent_tool_12345"));
        assert!(!probe.probe().await);

        let info = probe.info().await;
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[tokio::test]
    async fn test_probe_missing_configured_path() {
        let path = resolve_tool_path("ffmpeg", Some(Path::new("/nonexistent/dir/ffmpeg")));
        assert_eq!(path, PathBuf::from("/nonexistent/dir/ffmpeg"));
        assert!(!TranscoderProbe::new(path).probe().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_nonzero_exit_is_unavailable() {
        let probe = TranscoderProbe::new(PathBuf::from("false"));
        assert!(!probe.probe().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_success_reports_version() {
        let probe = TranscoderProbe::new(PathBuf::from("echo")).with_version_arg("fake version 1.0");
        let info = probe.info().await;
        assert!(info.available);
        assert_eq!(info.version.as_deref(), Some("fake version 1.0"));
        assert_eq!(info.name, "echo");
    }

    #[test]
    fn test_resolve_unknown_tool_falls_back_to_name() {
        let path = resolve_tool_path("nonexistent_tool_12345", None);
        assert_eq!(path, PathBuf::from("nonexistent_tool_12345"));
    }
}
