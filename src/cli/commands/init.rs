//! init command - Create or refresh the root user

use anyhow::{bail, Result};

use crate::cli::Context;
use crate::core::types::{Password, Username};

/// Create the root user, or replace the password of the existing one.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `username` - Root username; defaults to `root.username` from config
/// * `password` - Root password; prompted for when omitted
pub async fn init(ctx: &Context, username: Option<&str>, password: Option<String>) -> Result<()> {
    let username = Username::new(username.unwrap_or(ctx.config.root_username()))?;
    let password = read_password(password, "Root password: ")?;

    let manager = ctx.open_manager()?;
    let root = manager.initialize_root(username.clone(), password).await?;

    if root.username != username && !ctx.quiet {
        eprintln!(
            "Root already exists as '{}'; kept that name and updated its password.",
            root.username
        );
    }

    if !ctx.quiet {
        println!("Root user ready");
        println!("  id:       {}", root.id);
        println!("  username: {}", root.username);
        println!("  password: {}", root.password.expose());
    }

    Ok(())
}

/// Use the supplied password or prompt for one without echo.
pub(crate) fn read_password(supplied: Option<String>, prompt: &str) -> Result<Password> {
    let raw = match supplied {
        Some(raw) => raw,
        None => rpassword::prompt_password(prompt)?,
    };
    if raw.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(Password::new(raw))
}
