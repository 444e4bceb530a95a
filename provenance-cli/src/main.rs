//! Provenance CLI - sign and verify images, video and PDF documents.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use provenance_core::{ArtifactKind, GridSpec, ProvenanceConfig};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "provenance")]
#[command(author, version, about = "Signed content provenance for images, video and PDF documents", long_about = None)]
#[command(after_help = exit_codes::HELP_TEXT)]
struct Cli {
    /// Provenance store directory [env: PROVENANCE_DIR, default: provenance]
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    /// PEM private key [env: PROVENANCE_PRIVATE_KEY, default: keys/private_key.pem]
    #[arg(long, global = true, value_name = "PATH")]
    private_key: Option<PathBuf>,

    /// PEM public key [env: PROVENANCE_PUBLIC_KEY, default: keys/public_key.pem]
    #[arg(long, global = true, value_name = "PATH")]
    public_key: Option<PathBuf>,

    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an ECDSA P-256 key pair
    Keygen {
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Hash and sign an artifact into the provenance store
    Sign {
        /// Path to the artifact
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Artifact kind (detected from the extension if omitted)
        #[arg(long, value_name = "KIND", value_parser = utils::parse_kind)]
        kind: Option<ArtifactKind>,

        /// Block grid for images [env: PROVENANCE_GRID_ROWS/PROVENANCE_GRID_COLS, default: 8x8]
        #[arg(long, value_name = "ROWSxCOLS", value_parser = utils::parse_grid)]
        grid: Option<GridSpec>,
    },

    /// Verify an artifact against the provenance store
    Verify {
        /// Path to the artifact
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Artifact kind (detected from the extension if omitted)
        #[arg(long, value_name = "KIND", value_parser = utils::parse_kind)]
        kind: Option<ArtifactKind>,

        /// Print the verification report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a synthetic test image (white canvas with random rectangles)
    GenerateImage {
        /// Output path
        #[arg(value_name = "OUTPUT", default_value = "input.png")]
        output: PathBuf,

        /// Number of rectangles to draw
        #[arg(long, default_value_t = commands::generate::DEFAULT_RECTANGLES)]
        rectangles: u32,

        /// Seed for a reproducible image
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    fn config(&self) -> ProvenanceConfig {
        let mut config = ProvenanceConfig::from_env();
        if let Some(store) = &self.store {
            config.store_dir = store.clone();
        }
        if let Some(key) = &self.private_key {
            config.private_key_path = key.clone();
        }
        if let Some(key) = &self.public_key {
            config.public_key_path = key.clone();
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "provenance_core=info,provenance=info,warn",
        _ => "provenance_core=debug,provenance=debug,info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Keygen { force } => commands::keygen::execute(
            &config.private_key_path,
            &config.public_key_path,
            force,
            quiet,
        )
        .map(|()| ExitCode::success()),
        Commands::Sign { file, kind, grid } => {
            commands::sign::execute(file, kind, grid, &config, quiet).map(|()| ExitCode::success())
        }
        Commands::Verify { file, kind, json } => {
            commands::verify::execute(file, kind, &config, json, quiet).map(|code| ExitCode {
                code,
                message: None,
            })
        }
        Commands::GenerateImage {
            output,
            rectangles,
            seed,
        } => commands::generate::execute(output, rectangles, seed, quiet)
            .map(|()| ExitCode::success()),
    };

    let exit = result.unwrap_or_else(|err| ExitCode::from_anyhow(&err));
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
