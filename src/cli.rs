use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soundforged")]
#[command(author, version, about = "Audio recording upload and conversion service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides [server] host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert a single recording without starting the server
    Convert {
        /// Recording to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Target format (mp3 or wav)
        #[arg(short, long, default_value = "mp3")]
        format: String,

        /// MP3 bitrate in kbps (ignored for wav)
        #[arg(short, long)]
        quality: Option<u32>,

        /// Output path (default: input with the target extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the transcoder is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
