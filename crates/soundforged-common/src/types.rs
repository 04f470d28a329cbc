//! Core type definitions for conversion requests.
//!
//! Formats serialize in lowercase to match the form values the recorder page
//! posts (`mp3`, `wav`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Output format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III, lossy, bitrate controlled.
    Mp3,
    /// RIFF WAVE with 16-bit linear PCM.
    Wav,
}

impl AudioFormat {
    /// All supported output formats.
    pub const ALL: [AudioFormat; 2] = [AudioFormat::Mp3, AudioFormat::Wav];

    /// File extension for artifacts in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    /// Upper-case label shown to clients (`MP3`, `WAV`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
        }
    }

    /// Whether the requested bitrate affects the encoder.
    pub fn uses_bitrate(&self) -> bool {
        matches!(self, Self::Mp3)
    }

    /// Human description of the quality a conversion ran at.
    pub fn quality_label(&self, bitrate: Bitrate) -> String {
        if self.uses_bitrate() {
            bitrate.to_string()
        } else {
            "Uncompressed".to_string()
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            other => Err(Error::unsupported_format(other)),
        }
    }
}

/// Encoder bitrate in kilobits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bitrate(u32);

impl Bitrate {
    /// Lowest accepted bitrate.
    pub const MIN_KBPS: u32 = 32;
    /// Highest accepted bitrate (MPEG-1 Layer III ceiling).
    pub const MAX_KBPS: u32 = 320;
    /// Bitrate used when the client does not ask for one.
    pub const DEFAULT: Bitrate = Bitrate(192);

    /// Create a bitrate, validating the accepted range.
    pub fn new(kbps: u32) -> Result<Self, Error> {
        if (Self::MIN_KBPS..=Self::MAX_KBPS).contains(&kbps) {
            Ok(Self(kbps))
        } else {
            Err(Error::invalid_bitrate(kbps.to_string()))
        }
    }

    /// Value in kbps.
    pub fn kbps(&self) -> u32 {
        self.0
    }

    /// Value formatted for ffmpeg's `-b:a` option.
    pub fn ffmpeg_value(&self) -> String {
        format!("{}k", self.0)
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kbps", self.0)
    }
}

impl FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let kbps = trimmed
            .parse::<u32>()
            .map_err(|_| Error::invalid_bitrate(trimmed))?;
        Self::new(kbps)
    }
}
