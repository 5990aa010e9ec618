//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::config::{Config, KEYS};

/// Print the effective value of a configuration key.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = ctx.config.effective_value(key)?;
    println!("{}", value);
    Ok(())
}

/// Set a configuration value and write the file.
///
/// Writes back to the file the config was loaded from, or to the canonical
/// location when none was loaded.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = ctx.config.clone();
    config.set_value(key, value)?;

    let path = match config.loaded_from() {
        Some(path) => {
            Config::write_config_atomic(path, &config.file)
                .context("Failed to write config")?;
            path.to_path_buf()
        }
        None => Config::write(&config.file).context("Failed to write config")?,
    };

    if !ctx.quiet {
        println!("Set {} = {} (in {})", key, value, path.display());
    }
    Ok(())
}

/// List every key with its effective value.
///
/// Keys not set in the file are marked as defaults.
pub fn list(ctx: &Context) -> Result<()> {
    match ctx.config.loaded_from() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config file; defaults)"),
    }

    for key in KEYS {
        let value = ctx.config.effective_value(key)?;
        if ctx.config.value(key)?.is_some() {
            println!("{} = {}", key, value);
        } else {
            println!("{} = {} (default)", key, value);
        }
    }
    Ok(())
}
