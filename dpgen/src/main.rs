//! # dpgen
//!
//! Generates display peripheral setup code from a build manifest.
//!
//! # Usage
//!
//! ```bash
//! # C++ setup statements on stdout
//! dpgen --manifest panel.toml
//!
//! # Sequences as JSON, verbose logs
//! dpgen --manifest panel.toml --format json -v
//! ```

#![deny(warnings)]

use clap::Parser;
use dpgen::emit::{self, OutputFormat};
use dpgen::Generator;
use dpgen_common::config::{LogLevel, Manifest};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// dpgen - display peripheral setup generator
#[derive(Parser, Debug)]
#[command(name = "dpgen")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Validate display configuration and generate its setup sequence")]
#[command(long_about = None)]
struct Args {
    /// Path to the build manifest (TOML).
    #[arg(short, long, value_name = "FILE")]
    manifest: PathBuf,

    /// Output format: cpp or json
    #[arg(short, long, default_value = "cpp")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match run() {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when at least one instance failed.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let manifest = Manifest::load_validated(&args.manifest);
    let level = manifest
        .as_ref()
        .map(|m| m.build.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let manifest = manifest?;

    info!(
        "dpgen v{} generating '{}'",
        env!("CARGO_PKG_VERSION"),
        manifest.build.name
    );

    let mut generator = Generator::from_manifest(&manifest)?;
    let report = generator.generate(&manifest.display);

    let output = emit::render(&report.sequences, args.format)?;
    println!("{output}");

    if !report.is_success() {
        error!("{} display instance(s) failed", report.failures.len());
    }
    Ok(report.is_success())
}

fn setup_tracing(args: &Args, manifest_level: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(manifest_level.as_directive()))
    };

    if args.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
