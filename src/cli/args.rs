//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Assemble the documentation bundle and render the manual
#[derive(Parser, Debug)]
#[command(name = "docbundle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Repository root (default: parent of the directory holding this executable)
    #[arg(short = 'C', long, global = true, env = "DOCBUNDLE_ROOT", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate fragments, assemble the output directory and render (default)
    Build {
        /// Stop after the output directory is assembled
        #[arg(long)]
        no_render: bool,
    },

    /// Render an already assembled output directory
    Render,

    /// Remove the output directory
    Clean,

    /// Show layout and output directory state
    Status,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template in the repository root
    Init,

    /// Show config paths
    Path,
}
