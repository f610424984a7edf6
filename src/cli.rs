// src/cli.rs

//! CLI definitions for devsync
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devsync")]
#[command(author = "DevSync Project")]
#[command(version)]
#[command(
    about = "Synchronizes AI coding tool configuration with conflict-safe, tracked installs",
    long_about = None
)]
pub struct Cli {
    /// Target project root
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the project for existing configuration components
    Detect {
        /// Only scan locations belonging to these tools
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Only report these component kinds
        #[arg(long = "kind")]
        kinds: Vec<String>,

        /// Emit the inventory as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install components from a resolved source tree
    Install {
        /// Directory laid out like a project, holding the components
        source_dir: PathBuf,

        /// Origin recorded in the ledger (defaults to the source path)
        #[arg(long)]
        source: Option<String>,

        /// Version marker recorded in the ledger
        #[arg(long = "ref", default_value = "local")]
        source_ref: String,

        /// Conflict strategy: skip, overwrite, or rename
        #[arg(short, long)]
        strategy: Option<String>,

        /// Classify and report without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List tracked installations
    List,

    /// Remove a tracked component
    Uninstall {
        /// Component identity to remove
        identity: String,

        /// Component kind (required when the identity is ambiguous)
        #[arg(long)]
        kind: Option<String>,

        /// Installed path, for identities tracked at multiple paths
        #[arg(long)]
        path: Option<String>,

        /// Remove only the ledger entry, keep the file
        #[arg(long)]
        keep_file: bool,
    },

    /// List stored backups
    Backups {
        /// Only show backups taken in the last N days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Restore one backup to its original location
    Restore {
        /// Timestamp bucket of the backup
        bucket: String,

        /// Original relative path of the backed-up file
        path: String,
    },

    /// Delete backups older than a threshold
    Prune {
        /// Age threshold in days
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Also delete the last backup of still-tracked components
        #[arg(long)]
        no_keep_latest: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}
