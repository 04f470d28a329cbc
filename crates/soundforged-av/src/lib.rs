//! # soundforged-av
//!
//! Everything in soundforged that touches the external transcoder or the
//! scratch directory:
//!
//! - [`tools`]: locating ffmpeg and probing whether it runs
//! - [`command`]: running an external tool with a hard timeout
//! - [`staging`]: persisting uploads to uniquely named scratch files
//! - [`convert`]: the mp3/wav command contract and outcome classification
//!
//! ## Example
//!
//! ```no_run
//! use soundforged_av::{ConversionJob, ConversionOutcome, Converter, ConverterSettings, StagingStore};
//! use soundforged_common::Bitrate;
//!
//! # async fn example() -> soundforged_av::Result<()> {
//! let store = StagingStore::open("static/temp", "webm")?;
//! let staged = store.stage(b"...webm bytes...").await?;
//!
//! let converter = Converter::new(ConverterSettings::default());
//! let job = ConversionJob::new(staged.path(), store.path_for("out.mp3"), "mp3", Bitrate::DEFAULT);
//! let outcome = converter.convert(&job).await;
//! store.release(&staged).await?;
//!
//! if let ConversionOutcome::Success { size, .. } = outcome {
//!     println!("converted {size} bytes");
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub mod command;
pub mod convert;
pub mod staging;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use convert::{
    AudioProfile, ConversionJob, ConversionOutcome, Converter, ConverterSettings, FailureReason,
};
pub use error::{Error, Result};
pub use staging::{StagedInput, StagingStore};
pub use tools::{resolve_tool_path, ToolInfo, TranscoderProbe};
