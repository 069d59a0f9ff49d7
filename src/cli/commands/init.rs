//! Init and Config commands.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{DEFAULT_CONFIG_FILE, Settings};

/// Run init command - create configuration file.
pub fn run_init(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

    let created = Settings::init_config_file(path, force)
        .with_context(|| format!("cannot create {}", path.display()))?;
    println!("Created configuration file at: {}", created.display());
    println!("Edit this file to customize your pins and debounce window.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(config).context("cannot render configuration")?;
    println!("{toml_str}");
    Ok(())
}
