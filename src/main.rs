mod cli;

use soundforged::{config, server};
use soundforged_av::{ConversionJob, ConversionOutcome, Converter};
use soundforged_common::{AudioFormat, Bitrate};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    config::apply_server_overrides(&mut config, host, port);
    config::validate_config(&config)?;

    tracing::info!("Starting Soundforged server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        scratch_dir = %config.storage.scratch_dir.display(),
        ttl_secs = config.storage.artifact_ttl_secs,
        "Scratch storage configured"
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "soundforged=trace,soundforged_av=trace,soundforged_common=trace,tower_http=debug"
                .to_string()
        } else {
            "soundforged=debug,soundforged_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert {
            input,
            format,
            quality,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(
                &input,
                &format,
                quality,
                output,
                cli.config.as_deref(),
            ))
        }
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("soundforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert_file(
    input: &Path,
    format: &str,
    quality: Option<u32>,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let target: AudioFormat = format.parse()?;
    let quality = match quality {
        Some(kbps) => Bitrate::new(kbps)?,
        None => Bitrate::new(config.transcoder.default_quality)
            .context("Invalid transcoder.default_quality")?,
    };

    let output = output.unwrap_or_else(|| input.with_extension(target.extension()));
    if output == input {
        anyhow::bail!("Output would overwrite the input: {:?}", output);
    }

    let probe = config.transcoder.probe();
    if !probe.probe().await {
        anyhow::bail!(
            "Transcoder not available at {}",
            probe.program().display()
        );
    }

    let converter = Converter::new(config.transcoder.converter_settings());
    let job = ConversionJob::new(input, &output, target.extension(), quality);

    match converter.convert(&job).await {
        ConversionOutcome::Success { output, size } => {
            println!("✓ Converted to {}", output.display());
            println!("  Format: {}", target.label());
            println!("  Quality: {}", target.quality_label(quality));
            println!("  Size: {} bytes", size);
            Ok(())
        }
        ConversionOutcome::Failure { reason, diagnostic } => {
            if !diagnostic.is_empty() {
                eprintln!("{}", diagnostic);
            }
            anyhow::bail!("Conversion failed: {} ({})", reason.message(), reason.code())
        }
    }
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tool = config.transcoder.probe().info().await;
    let status = if tool.available { "✓" } else { "✗" };

    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({})", version.lines().next().unwrap_or(""));
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!();

    println!();
    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Uploads will be rejected until it is installed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Upload limit: {} MB", config.server.max_upload_mb);
            println!("  Scratch dir: {}", config.storage.scratch_dir.display());
            println!("  Artifact TTL: {}s", config.storage.artifact_ttl_secs);
            println!("  Transcoder timeout: {}s", config.transcoder.timeout_secs);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
