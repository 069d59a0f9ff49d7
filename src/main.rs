use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use pinwatch::cli::commands::{configure, init, watch};
use pinwatch::cli::{Cli, Commands};
use pinwatch::config::Settings;
use pinwatch::logging;

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = Settings::load(path).context("cannot load configuration")?;
    logging::init_with_config(&settings.logging);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        // Init must work without a loadable configuration.
        Commands::Init { force } => init::run_init(config_path, force),
        Commands::Config => init::run_config(&load_settings(config_path)?),
        Commands::Configure { pins } => {
            configure::run_configure(&load_settings(config_path)?, &pins)
        }
        Commands::Watch {
            pins,
            window_ms,
            capacity,
            raw,
            no_configure,
            json,
        } => {
            let settings = load_settings(config_path)?;
            let options = watch::WatchOptions {
                pins,
                window_ms,
                capacity,
                raw,
                no_configure,
                json,
            };
            watch::run_watch(&settings, options).await
        }
    }
}
