//! add and assign commands - Create users and move them between bosses

use anyhow::Result;

use super::init::read_password;
use crate::cli::{resolve_user, Context};
use crate::core::types::Username;
use crate::hierarchy::NewUser;

/// Create a user.
///
/// Prints the new node id in quiet mode so scripts can capture it.
pub async fn add(ctx: &Context, username: &str, admin: bool, password: Option<String>) -> Result<()> {
    let username = Username::new(username)?;
    let password = read_password(password, &format!("Password for {}: ", username))?;

    let manager = ctx.open_initialized().await?;
    let node = manager
        .create_user(NewUser {
            username,
            password,
            is_admin: admin,
        })
        .await?;

    if ctx.quiet {
        println!("{}", node.id);
    } else {
        println!("Created {} '{}' ({})", node.role, node.username, node.id);
    }
    Ok(())
}

/// Move `worker` under `boss`, or under the root when `boss` is omitted.
pub async fn assign(ctx: &Context, worker: &str, boss: Option<&str>) -> Result<()> {
    let manager = ctx.open_initialized().await?;
    let worker = resolve_user(&manager, worker).await?;
    let boss = match boss {
        Some(arg) => Some(resolve_user(&manager, arg).await?),
        None => None,
    };

    let moved = match manager
        .reassign_worker(boss.as_ref().map(|b| b.id), worker.id)
        .await
    {
        Ok(moved) => moved,
        Err(err) => {
            if err.may_be_partial() {
                eprintln!(
                    "hint: the move may be half-applied; \
                     run 'orgtree doctor --fix' to recompute worker counts"
                );
            }
            return Err(err.into());
        }
    };

    if !ctx.quiet {
        match &moved.boss {
            Some(boss) => println!(
                "{} now reports to {} ({} worker(s))",
                moved.worker.username, boss.username, boss.count_of_workers
            ),
            None => println!("{} now reports to the root", moved.worker.username),
        }
    }
    Ok(())
}
