//! Soundforged-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across soundforged:
//!
//! - **Typed IDs**: [`StagingToken`] for staged uploads and [`ArtifactId`]
//!   for converted recordings
//! - **Core Types**: [`AudioFormat`] and [`Bitrate`], the two knobs a client
//!   can turn on a conversion
//! - **Path Utilities**: scratch-directory naming and filename sanitization
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use soundforged_common::{AudioFormat, Bitrate, StagingToken};
//! use soundforged_common::paths::staged_input_name;
//!
//! let format: AudioFormat = "mp3".parse()?;
//! let quality: Bitrate = "128".parse()?;
//! assert_eq!(quality.to_string(), "128 kbps");
//!
//! let token = StagingToken::new();
//! assert!(staged_input_name(&token, "webm").starts_with("temp_"));
//! # let _ = format;
//! # Ok::<(), soundforged_common::Error>(())
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
