//! Capgen CLI - batch image captioning against local VLM endpoints.
//!
//! Capgen scans a folder of images, generates captions through a configured
//! vision-language-model endpoint, and saves the results as loose sidecar
//! files or a packaged dataset archive.
//!
//! # Usage
//!
//! ```bash
//! # Caption a folder using a prompt template, saving sidecar .txt files
//! capgen caption ./photos --template booru --loose
//!
//! # Package everything into a training dataset archive
//! capgen caption ./photos --template booru --dataset dataset.zip
//!
//! # View configuration
//! capgen config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Capgen - batch image captioning and dataset export.
#[derive(Parser, Debug)]
#[command(name = "capgen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Caption a folder of images and export the results
    Caption(cli::caption::CaptionArgs),

    /// View and manage settings
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    tracing::debug!("Capgen v{}", capgen_core::VERSION);

    // Settings load failures fall back to defaults with a warning so
    // `config init` stays reachable with a broken file.
    let settings = match capgen_core::Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(
                "Failed to load settings: {e} — using defaults. \
                 Check your settings file with `capgen config path`."
            );
            capgen_core::Settings::default()
        }
    };

    match cli.command {
        Commands::Caption(args) => cli::caption::execute(args, settings).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
