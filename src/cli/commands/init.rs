//! Init and Config commands.

use std::path::PathBuf;

use crate::config::{CONFIG_DIR, Settings};

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    Settings::default()
        .save(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", config_path.display()))?;
    println!("Created configuration file at: {}", config_path.display());
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
