//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::LinkMode;

/// Build system trees from blueprints and watch messages travel through them
#[derive(Parser, Debug)]
#[command(name = "systree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Blueprint file describing the tree (default: from settings)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub blueprint: Option<PathBuf>,

    /// Override the configured link mode
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Literal,
    Strict,
}

impl From<ModeArg> for LinkMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Literal => LinkMode::Literal,
            ModeArg::Strict => LinkMode::Strict,
        }
    }
}

/// Parse `CHILD:PARENT` into its two names.
fn parse_link(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((child, parent)) if !child.is_empty() && !parent.is_empty() => {
            Ok((child.to_string(), parent.to_string()))
        }
        _ => Err(format!("expected CHILD:PARENT, got '{}'", s)),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the hierarchy
    Tree,

    /// Broadcast a message to the whole tree of a system
    Post {
        /// System posting the message
        #[arg(long)]
        from: String,

        /// Message kind (default: from settings)
        #[arg(long)]
        kind: Option<String>,

        /// Left payload
        #[arg(long)]
        lparam: Option<String>,

        /// Right payload
        #[arg(long)]
        rparam: Option<String>,

        /// Skip the sender's own subtree
        #[arg(long, conflicts_with_all = ["no_filter", "source"])]
        filter: bool,

        /// Deliver to the sender's subtree even if settings filter it
        #[arg(long, conflicts_with = "source")]
        no_filter: bool,

        /// Explicit sender whose subtree is skipped
        #[arg(long)]
        source: Option<String>,

        /// Remove a system from its parent before posting (repeatable)
        #[arg(long, value_name = "NAME")]
        detach: Vec<String>,

        /// Add CHILD under PARENT before posting, after any detach (repeatable)
        #[arg(long, value_name = "CHILD:PARENT", value_parser = parse_link)]
        reparent: Vec<(String, String)>,
    },

    /// Show the child of a system at a position
    Child {
        /// Parent system name
        name: String,

        /// Zero-based position in insertion order
        index: usize,
    },

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

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Print a commented settings template
    Template,
    /// Show config file locations
    Path,
}
