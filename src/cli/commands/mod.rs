//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the store through the [`Context`]
//! 2. Resolves user arguments to nodes
//! 3. Calls the hierarchy manager
//! 4. Formats and displays output
//!
//! Handlers never write node records themselves.

mod config_cmd;
mod init;
mod log_cmd;
mod relationships;
mod users;

// Re-export command functions for testing and direct invocation
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use init::init;
pub use log_cmd::log;
pub use relationships::{boss, is_boss, workers};
pub use users::{add, assign};

use anyhow::{bail, Result};

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use crate::doctor::{Doctor, DoctorError};

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { username, password } => init(ctx, username.as_deref(), password).await,
        Command::Add {
            username,
            admin,
            password,
        } => add(ctx, &username, admin, password).await,
        Command::Assign { worker, boss } => assign(ctx, &worker, boss.as_deref()).await,
        Command::Boss { user } => relationships::boss(ctx, &user).await,
        Command::Workers { user } => workers(ctx, &user).await,
        Command::IsBoss { candidate, user } => is_boss(ctx, &candidate, &user).await,
        Command::Log { long } => log(ctx, long).await,
        Command::Doctor { fix } => doctor(ctx, fix).await,
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_get(ctx, &key),
            ConfigAction::Set { key, value } => config_set(ctx, &key, &value),
            ConfigAction::List => config_list(ctx),
        },
    }
}

/// Diagnose the store and optionally recompute worker counts.
///
/// Exits with an error while blocking issues remain so scripts can gate on
/// the exit code.
async fn doctor(ctx: &Context, fix: bool) -> Result<()> {
    // A missing root is itself a diagnosis, so the root is not loaded here.
    let manager = ctx.open_manager()?;

    let doctor = Doctor::new();
    let report = doctor.check(&manager).await?;

    if report.is_healthy() {
        if !ctx.quiet {
            println!("{}", report.format());
        }
        return Ok(());
    }

    if !fix {
        println!("{}", report.format());
        if report.has_blocking_issues() {
            bail!("{} blocking issue(s) found", report.summary.blocking_count);
        }
        return Ok(());
    }

    match doctor.repair_counts(&manager).await {
        Ok(outcome) => {
            if !ctx.quiet {
                for repair in &outcome.applied {
                    println!(
                        "Repaired {}: count_of_workers {} -> {}",
                        repair.node, repair.from, repair.to
                    );
                }
                println!("{} node(s) repaired.", outcome.applied.len());
            }
            Ok(())
        }
        Err(DoctorError::BlockingIssues(n)) => {
            println!("{}", report.format());
            bail!("{} blocking issue(s) must be fixed by hand before counts can be repaired", n)
        }
        Err(err) => Err(err.into()),
    }
}
