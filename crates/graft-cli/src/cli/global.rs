//! Flags shared by every `graft` subcommand.
//!
//! They are flattened into [`super::Cli`] with `global = true`, so
//! `graft map people.toml -vv --strict` and `graft -vv --strict map ...`
//! mean the same thing.

use clap::{ArgAction, Args};
use std::path::PathBuf;

#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Log more: `-v` for mapper setup and finished mappings, `-vv` for plan
    /// builds and loaded files, `-vvv` for every field copy.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Abort `graft map` on the first conversion failure, whatever the
    /// mapping files' `[configuration] strict` says.
    ///
    /// Without it a failed field is reported and the partial document is
    /// still printed.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Never emit ANSI colours (honours `NO_COLOR`).
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Read settings from FILE instead of the platform config path.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How `check` and `plans` render their reports.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human on a terminal, plain otherwise.
    #[default]
    Auto,
    Human,
    Plain,
    /// Machine-readable reports (`plans` prints resolved bindings).
    Json,
}
