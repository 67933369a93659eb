//! The `capgen config` command for settings management.

use capgen_core::Settings;
use clap::{Args, Subcommand};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for settings management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current settings
    Show,

    /// Show settings file path
    Path,

    /// Initialize a new settings file with defaults
    Init {
        /// Overwrite existing settings file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let settings = Settings::load()?;
            let toml = settings.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Settings::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Settings::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Settings file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Write default settings
            let settings = Settings::default();
            let toml = settings.to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Settings file created at: {}", path.display());
            println!("Settings initialized at: {}", path.display());
        }
    }

    Ok(())
}
