//! boss, workers and is-boss commands - Relationship queries

use anyhow::Result;

use crate::cli::{resolve_user, Context};

/// Print the username of the user's boss.
///
/// Outputs nothing (exit 0) for the root.
pub async fn boss(ctx: &Context, user: &str) -> Result<()> {
    let manager = ctx.open_initialized().await?;
    let node = resolve_user(&manager, user).await?;

    match manager.boss_of(node.id).await? {
        Some(boss) => println!("{}", boss.username),
        None if !ctx.quiet => eprintln!("'{}' is the root and has no boss", node.username),
        None => {}
    }
    Ok(())
}

/// Print the usernames of the user's direct workers, oldest first.
///
/// Outputs nothing (exit 0) if there are none.
pub async fn workers(ctx: &Context, user: &str) -> Result<()> {
    let manager = ctx.open_initialized().await?;
    let node = resolve_user(&manager, user).await?;

    for worker in manager.workers_of(node.id).await? {
        println!("{}", worker.username);
    }
    Ok(())
}

/// Print `true` if `candidate` is above `user`, else `false`.
pub async fn is_boss(ctx: &Context, candidate: &str, user: &str) -> Result<()> {
    let manager = ctx.open_initialized().await?;
    let candidate = resolve_user(&manager, candidate).await?;
    let node = resolve_user(&manager, user).await?;

    let answer = manager.is_ancestor_of(candidate.id, node.id).await?;
    println!("{}", answer);
    Ok(())
}
