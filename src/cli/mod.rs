//! cli
//!
//! Command-line interface layer for orgtree.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Open the file store and build the [`HierarchyManager`]
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers resolve user arguments to nodes and call
//! the hierarchy manager; every structural change goes through
//! [`HierarchyManager::reassign_worker`]. Handlers are async and run on a
//! single tokio runtime built in [`run`].

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::node::Node;
use crate::core::paths::OrgPaths;
use crate::core::types::{NodeId, Username};
use crate::hierarchy::{HierarchyManager, HierarchySettings, RootRegistry};
use crate::store::{FileNodeStore, StoreError};

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// `--data-dir` override.
    pub data_dir: Option<PathBuf>,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Loaded configuration.
    pub config: Config,
}

impl Context {
    /// Store directory: `--data-dir`, then config, then the default.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.config.data_dir()?),
        }
    }

    /// Open the store and build a manager without publishing a root.
    pub fn open_manager(&self) -> Result<HierarchyManager<FileNodeStore>> {
        let data_dir = self.data_dir()?;
        let store = FileNodeStore::open(OrgPaths::new(data_dir.clone())).map_err(|e| match e {
            StoreError::Locked => anyhow::anyhow!(
                "store at {} is in use by another orgtree process",
                data_dir.display()
            ),
            other => anyhow::Error::new(other)
                .context(format!("failed to open store at {}", data_dir.display())),
        })?;

        Ok(HierarchyManager::new(
            Arc::new(store),
            Arc::new(RootRegistry::new()),
            HierarchySettings::from_config(&self.config),
        ))
    }

    /// Open the store and adopt its root.
    pub async fn open_initialized(&self) -> Result<HierarchyManager<FileNodeStore>> {
        let manager = self.open_manager()?;
        manager
            .load_root()
            .await
            .context("no root user found; run 'orgtree init' first")?;
        Ok(manager)
    }
}

/// Resolve a user argument: a node id if it parses as one, else a username.
pub async fn resolve_user(manager: &HierarchyManager<FileNodeStore>, arg: &str) -> Result<Node> {
    if let Ok(id) = arg.parse::<NodeId>() {
        return Ok(manager.get_user(id).await?);
    }
    let username = Username::new(arg)?;
    Ok(manager.find_user(&username).await?)
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli, config: Config) -> Result<()> {
    let ctx = Context {
        data_dir: cli.data_dir.clone(),
        quiet: cli.quiet,
        config,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::dispatch(cli.command, &ctx))
}
