//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] over a temp
//! scratch directory and a fake transcoder script. The [`with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.
//!
//! [`with_server`]: TestHarness::with_server

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use soundforged::config::Config;
use soundforged::server::{create_router, AppContext};
use tempfile::TempDir;

/// Behavior of the fake `ffmpeg` placed at `transcoder.ffmpeg_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeTranscoder {
    /// Answers `-version` and writes an output half the size of the input.
    Working,
    /// Answers `-version`, then exits non-zero with a diagnostic.
    Failing,
    /// Answers `-version`, touches the output, then sleeps past any timeout.
    Hanging,
    /// Points at a path that does not exist.
    Missing,
}

const WORKING_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-fake Copyright (c) the soundforged tests"
  exit 0
fi
in="$2"
for last; do :; done
size=$(wc -c < "$in")
head -c $((size / 2)) "$in" > "$last"
"#;

const FAILING_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-fake"
  exit 0
fi
echo "Invalid data found when processing input" >&2
exit 1
"#;

const HANGING_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-fake"
  exit 0
fi
for last; do :; done
: > "$last"
exec sleep 30
"#;

/// Write an executable script into `dir` and return its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

/// Install a fake transcoder under `dir` and return the path to configure.
pub fn install_transcoder(dir: &Path, fake: FakeTranscoder) -> PathBuf {
    match fake {
        FakeTranscoder::Working => write_script(dir, "ffmpeg", WORKING_SCRIPT),
        FakeTranscoder::Failing => write_script(dir, "ffmpeg", FAILING_SCRIPT),
        FakeTranscoder::Hanging => write_script(dir, "ffmpeg", HANGING_SCRIPT),
        FakeTranscoder::Missing => dir.join("nonexistent_ffmpeg_12345"),
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a harness with a working fake transcoder and default settings.
    pub fn new() -> Self {
        Self::with_transcoder(FakeTranscoder::Working)
    }

    pub fn with_transcoder(fake: FakeTranscoder) -> Self {
        Self::with_config(fake, |_| {})
    }

    /// Create a harness, letting the caller adjust the config before wiring.
    pub fn with_config(fake: FakeTranscoder, adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let tools = dir.path().join("bin");
        std::fs::create_dir_all(&tools).expect("failed to create tools dir");

        let mut config = Config::default();
        config.storage.scratch_dir = dir.path().join("scratch");
        config.transcoder.ffmpeg_path = Some(install_transcoder(&tools, fake));
        config.transcoder.probe_timeout_secs = 5;
        adjust(&mut config);

        let ctx = AppContext::from_config(config).expect("failed to build context");
        Self { ctx, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.ctx.config.storage.scratch_dir.clone()
    }

    /// Sorted names of everything in the scratch directory.
    pub fn scratch_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.scratch_dir())
            .expect("failed to read scratch dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Deterministic fake recording bytes.
pub fn fake_recording(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Build the multipart form the recorder page sends.
pub fn upload_form(
    audio: Vec<u8>,
    format: Option<&str>,
    quality: Option<&str>,
) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(audio)
        .file_name("recording.webm")
        .mime_str("audio/webm")
        .expect("valid mime");

    let mut form = reqwest::multipart::Form::new().part("audio", part);
    if let Some(format) = format {
        form = form.text("format", format.to_string());
    }
    if let Some(quality) = quality {
        form = form.text("quality", quality.to_string());
    }
    form
}

/// POST an upload and return the status with the parsed JSON body.
pub async fn post_upload(
    addr: SocketAddr,
    form: reqwest::multipart::Form,
) -> (reqwest::StatusCode, serde_json::Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/upload_audio"))
        .multipart(form)
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    let json = resp.json().await.expect("response was not JSON");
    (status, json)
}
