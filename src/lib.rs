//! Soundforged - browser recording upload, conversion, and short-lived downloads
//!
//! This library crate exposes the core functionality for integration testing.

pub mod artifacts;
pub mod config;
pub mod pipeline;
pub mod server;
