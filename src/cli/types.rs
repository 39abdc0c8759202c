//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::FlagId;

#[derive(Parser, Debug)]
#[command(name = "flagstate")]
#[command(
    about = "flagstate - cached feature flag store with change notifications",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .flagstate/config.yaml and local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List all feature flags
    List,

    /// Create a feature flag
    Create {
        /// Flag name
        name: String,

        /// Create the flag enabled
        #[arg(short, long)]
        enabled: bool,
    },

    /// Replace the name and state of an existing flag
    Update {
        /// Flag ID
        id: FlagId,

        /// New flag name
        name: String,

        /// New state (true or false)
        #[arg(short, long, action = ArgAction::Set, required = true)]
        enabled: bool,
    },

    /// Delete a feature flag
    Delete {
        /// Flag ID
        id: FlagId,
    },
}
