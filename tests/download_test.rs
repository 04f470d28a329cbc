//! Download and expiry integration tests.

#![cfg(unix)]

mod common;

use common::{fake_recording, post_upload, upload_form, FakeTranscoder, TestHarness};
use serial_test::serial;
use std::time::Duration;

async fn upload_one(addr: std::net::SocketAddr) -> String {
    let (status, json) = post_upload(addr, upload_form(fake_recording(4096), Some("mp3"), None)).await;
    assert_eq!(status, 200, "body: {json}");
    json["filename"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn download_returns_attachment() {
    let (_harness, addr) = TestHarness::with_server().await;
    let filename = upload_one(addr).await;

    let resp = reqwest::get(format!("http://{addr}/download/{filename}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let headers = resp.headers().clone();
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(
        headers["content-disposition"],
        format!("attachment; filename=\"{filename}\"").as_str()
    );
    assert_eq!(headers["content-length"], "2048");

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), 2048);
    assert_eq!(&body[..], &fake_recording(4096)[..2048]);
}

#[tokio::test]
#[serial]
async fn download_can_repeat_until_expiry() {
    let (_harness, addr) = TestHarness::with_server().await;
    let filename = upload_one(addr).await;

    for _ in 0..3 {
        let resp = reqwest::get(format!("http://{addr}/download/{filename}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
}

#[tokio::test]
#[serial]
async fn unknown_artifact_is_not_found() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!(
        "http://{addr}/download/recording_20240101_000000_deadbeef.mp3"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 404);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
#[serial]
async fn traversal_is_not_found() {
    let (_harness, addr) = TestHarness::with_server().await;

    for name in ["..%2Fconfig.toml", "%2Fetc%2Fpasswd", ".hidden", "a%20b.mp3"] {
        let resp = reqwest::get(format!("http://{addr}/download/{name}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404, "name: {name}");
    }
}

#[tokio::test]
#[serial]
async fn staged_inputs_are_not_downloadable() {
    let (harness, addr) = TestHarness::with_server().await;
    std::fs::write(harness.scratch_dir().join("temp_deadbeef.webm"), b"raw").unwrap();

    let resp = reqwest::get(format!("http://{addr}/download/temp_deadbeef.webm"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
#[serial]
async fn artifact_expires_after_ttl() {
    let harness = TestHarness::with_config(FakeTranscoder::Working, |config| {
        config.storage.artifact_ttl_secs = 1;
    });
    let (harness, addr) = harness.serve().await;
    let filename = upload_one(addr).await;

    let resp = reqwest::get(format!("http://{addr}/download/{filename}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    drop(resp);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let resp = reqwest::get(format!("http://{addr}/download/{filename}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(!harness.scratch_dir().join(&filename).exists());
    assert_eq!(harness.ctx.artifacts().active_count(), 0);
}

#[tokio::test]
#[serial]
async fn shutdown_deletes_remaining_artifacts() {
    let (harness, addr) = TestHarness::with_server().await;
    let filename = upload_one(addr).await;
    assert!(harness.scratch_dir().join(&filename).exists());

    let deleted = harness.ctx.artifacts().shutdown().await;
    assert_eq!(deleted, 1);
    assert!(harness.scratch_files().is_empty());
}
