//! Command-line interface definitions.
//!
//! This module contains only clap struct definitions - no business logic.
//! All command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use verasm::EmitterOptionsOverride;

/// Verasm - a verifying assembler for a typed stack machine
#[derive(Parser, Debug)]
#[command(name = "verasm", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify listing files
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Files to verify ("-" reads stdin)
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Only report through the exit status
    #[arg(short, long)]
    pub quiet: bool,

    /// Print each verified method with the stack depth after every
    /// instruction
    #[arg(long, conflicts_with = "quiet")]
    pub emit: bool,

    /// Deepest the operand stack may grow
    #[arg(long, value_name = "N")]
    pub max_stack: Option<usize>,

    /// Accept labels that are defined but never marked, as long as no
    /// branch refers to them
    #[arg(long)]
    pub allow_unmarked_labels: bool,
}

impl CheckArgs {
    pub fn overrides(&self) -> EmitterOptionsOverride {
        EmitterOptionsOverride {
            max_stack: self.max_stack,
            require_marked_labels: self.allow_unmarked_labels.then_some(false),
        }
    }
}

/// Arguments for the `completions` command.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
