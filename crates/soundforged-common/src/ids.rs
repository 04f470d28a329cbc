//! Typed identifiers for staged uploads and converted artifacts.
//!
//! Both identifiers end up embedded in file names inside the shared scratch
//! directory, so they are generated from random UUIDs rather than counters:
//! two concurrent requests never contend for the same path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::paths::{self, ARTIFACT_PREFIX};
use crate::{AudioFormat, Error, Result};

/// Number of hex characters used for the short form of a token.
pub const SHORT_TOKEN_LEN: usize = 8;

/// Random token naming a single staged upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingToken(Uuid);

impl StagingToken {
    /// Generate a new random staging token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short hex form used inside file names (first 8 hex digits).
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(SHORT_TOKEN_LEN);
        simple
    }
}

impl Default for StagingToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for StagingToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<StagingToken> for Uuid {
    fn from(token: StagingToken) -> Self {
        token.0
    }
}

impl fmt::Display for StagingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Identifier of a converted artifact.
///
/// The identifier is the artifact's file name inside the scratch directory,
/// e.g. `recording_20261018_101500_3f2a9c1b.mp3`, and is what clients put in
/// the download URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Build the identifier for a new artifact.
    ///
    /// The short random suffix is taken from the staging token so that an
    /// artifact can be correlated with the upload it came from in logs.
    pub fn generate(created_at: DateTime<Utc>, token: &StagingToken, format: AudioFormat) -> Self {
        Self(format!(
            "{ARTIFACT_PREFIX}{}_{}.{}",
            created_at.format("%Y%m%d_%H%M%S"),
            token.short(),
            format.extension()
        ))
    }

    /// Parse an identifier received from a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the value is not a plain file
    /// name (separators, parent references, hidden names, odd characters).
    pub fn parse(value: &str) -> Result<Self> {
        paths::sanitize_file_name(value)
            .map(|name| Self(name.to_string()))
            .ok_or_else(|| Error::invalid_identifier(value))
    }

    /// The identifier as a file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_staging_token_unique() {
        let a = StagingToken::new();
        let b = StagingToken::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_staging_token_short() {
        let token = StagingToken::from(Uuid::parse_str("3f2a9c1b-0000-4000-8000-000000000000").unwrap());
        assert_eq!(token.short(), "3f2a9c1b");
        assert_eq!(token.to_string(), "3f2a9c1b");
    }

    #[test]
    fn test_artifact_id_generate() {
        let token = StagingToken::from(Uuid::parse_str("3f2a9c1b-0000-4000-8000-000000000000").unwrap());
        let created = Utc.with_ymd_and_hms(2026, 10, 18, 10, 15, 0).unwrap();

        let id = ArtifactId::generate(created, &token, AudioFormat::Mp3);
        assert_eq!(id.as_str(), "recording_20261018_101500_3f2a9c1b.mp3");

        let id = ArtifactId::generate(created, &token, AudioFormat::Wav);
        assert_eq!(id.as_str(), "recording_20261018_101500_3f2a9c1b.wav");
    }

    #[test]
    fn test_artifact_id_parse() {
        let id = ArtifactId::parse("recording_20261018_101500_3f2a9c1b.mp3").unwrap();
        assert_eq!(id.to_string(), "recording_20261018_101500_3f2a9c1b.mp3");

        assert!(ArtifactId::parse("../recording.mp3").is_err());
        assert!(ArtifactId::parse("a/b.mp3").is_err());
        assert!(ArtifactId::parse("a\\b.mp3").is_err());
        assert!(ArtifactId::parse("").is_err());
    }

    #[test]
    fn test_artifact_id_serde_transparent() {
        let id = ArtifactId::parse("recording_x.wav").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"recording_x.wav\"");
    }
}
