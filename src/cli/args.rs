//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--data-dir <path>`: Use this store instead of the configured one
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//!
//! # User Arguments
//!
//! Commands that take a user accept either a username or a node id.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// orgtree - Organizational hierarchy manager
#[derive(Parser, Debug)]
#[command(name = "orgtree")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the node store (overrides `data_dir` in config)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or refresh the root user
    #[command(
        name = "init",
        long_about = "Create or refresh the root user.\n\n\
            On a fresh store this creates the root. If a root already exists its \
            password is replaced and its username is kept. The credentials are \
            printed once.",
        after_help = "\
EXAMPLES:
    # Initialize with the configured root username, prompting for a password
    orgtree init

    # Non-interactive
    orgtree init --username boss --password s3cret"
    )]
    Init {
        /// Root username (defaults to `root.username` from config)
        #[arg(long)]
        username: Option<String>,

        /// Root password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a user
    #[command(
        name = "add",
        long_about = "Create a user.\n\n\
            Standard users start directly under the root. Admins start without a \
            boss and report to the root until they are assigned.",
        after_help = "\
EXAMPLES:
    orgtree add alice --admin --password pw
    orgtree add bob --password pw"
    )]
    Add {
        /// Username of the new user
        username: String,

        /// Create an admin instead of a standard user
        #[arg(long)]
        admin: bool,

        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Move a user under a new boss
    #[command(
        name = "assign",
        long_about = "Move a user under a new boss.\n\n\
            Without --boss the user is moved under the root. Refuses to place a \
            user under themselves or under anyone who reports to them.",
        after_help = "\
EXAMPLES:
    # bob now reports to alice
    orgtree assign bob --boss alice

    # bob reports to the root again
    orgtree assign bob"
    )]
    Assign {
        /// User to move
        worker: String,

        /// New boss (defaults to the root)
        #[arg(long)]
        boss: Option<String>,
    },

    /// Print the boss of a user
    #[command(name = "boss")]
    Boss {
        /// Username or node id
        user: String,
    },

    /// List the direct workers of a user
    #[command(name = "workers")]
    Workers {
        /// Username or node id
        user: String,
    },

    /// Check whether one user is above another
    #[command(
        name = "is-boss",
        long_about = "Check whether CANDIDATE is above USER in the hierarchy.\n\n\
            Prints `true` or `false`. A user is never their own boss. Admins \
            without a boss count as above everyone else.",
        after_help = "\
EXAMPLES:
    orgtree is-boss alice bob"
    )]
    IsBoss {
        /// Possible ancestor
        candidate: String,

        /// User whose chain is examined
        user: String,
    },

    /// Display the hierarchy as a tree
    #[command(name = "log")]
    Log {
        /// Show node ids and worker counts
        #[arg(short, long)]
        long: bool,
    },

    /// Check the store for inconsistencies
    #[command(
        name = "doctor",
        long_about = "Check the store for inconsistencies.\n\n\
            Verifies that there is exactly one root, that boss links form a tree, \
            and that every worker count matches the boss links. With --fix, worker \
            counts are recomputed from the boss links. Boss links are never changed.",
        after_help = "\
EXAMPLES:
    # Report problems
    orgtree doctor

    # Recompute drifted worker counts
    orgtree doctor --fix"
    )]
    Doctor {
        /// Recompute worker counts from boss links
        #[arg(long)]
        fix: bool,
    },

    /// Get and set configuration values
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}
