//! Scratch-directory naming and filename sanitization.
//!
//! Every file soundforged writes lives flat in one scratch directory and
//! carries one of two prefixes: [`STAGED_PREFIX`] for raw uploads awaiting
//! conversion and [`ARTIFACT_PREFIX`] for converted recordings.

use crate::StagingToken;

/// Prefix of staged (not yet converted) uploads.
pub const STAGED_PREFIX: &str = "temp_";

/// Prefix of converted artifacts.
pub const ARTIFACT_PREFIX: &str = "recording_";

/// Longest file name accepted from a client.
const MAX_NAME_LEN: usize = 255;

/// File name for a staged upload, e.g. `temp_3f2a9c1b.webm`.
pub fn staged_input_name(token: &StagingToken, extension: &str) -> String {
    format!("{STAGED_PREFIX}{}.{extension}", token.short())
}

/// Check whether a file name belongs to soundforged.
///
/// # Examples
///
/// ```
/// use soundforged_common::paths::is_managed_file;
///
/// assert!(is_managed_file("temp_3f2a9c1b.webm"));
/// assert!(is_managed_file("recording_20261018_101500_3f2a9c1b.mp3"));
/// assert!(!is_managed_file("index.html"));
/// ```
pub fn is_managed_file(name: &str) -> bool {
    name.starts_with(STAGED_PREFIX) || name.starts_with(ARTIFACT_PREFIX)
}

/// Accept a client-supplied name only if it is a plain file name.
///
/// Unlike a "secure filename" helper this never rewrites the input: anything
/// that would need rewriting is rejected, so a sanitized name always refers
/// to exactly the file the client asked for.
///
/// # Examples
///
/// ```
/// use soundforged_common::paths::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("recording_1.mp3"), Some("recording_1.mp3"));
/// assert_eq!(sanitize_file_name("../secret"), None);
/// assert_eq!(sanitize_file_name("a/b.mp3"), None);
/// ```
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return None;
    }
    if name.starts_with('.') || name.contains("..") {
        return None;
    }
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    plain.then_some(name)
}
