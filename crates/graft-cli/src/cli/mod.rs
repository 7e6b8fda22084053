//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "graft",
    bin_name = "graft",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Rule-driven mapping between object models",
    long_about = "graft copies field values between two independently defined \
                  type models, driven by TOML mapping files.",
    after_help = "EXAMPLES:\n\
        \x20 graft check ./mappings\n\
        \x20 graft plans ./mappings --from Person --to PersonDto\n\
        \x20 graft map ./mappings --from Person --to PersonDto --input person.json\n\
        \x20 graft completions bash > /usr/share/bash-completion/completions/graft",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load mapping files and resolve every declared mapping.
    #[command(
        about = "Validate mapping files",
        after_help = "EXAMPLES:\n\
            \x20 graft check ./mappings\n\
            \x20 graft check people.toml --output-format json"
    )]
    Check(CheckArgs),

    /// Print resolved correspondence plans.
    #[command(
        visible_alias = "ls",
        about = "Show resolved plans",
        after_help = "EXAMPLES:\n\
            \x20 graft plans ./mappings\n\
            \x20 graft plans ./mappings --from Person --to PersonDto --map-id brief"
    )]
    Plans(PlansArgs),

    /// Map a JSON document from one type to another.
    #[command(
        about = "Map a JSON document",
        after_help = "EXAMPLES:\n\
            \x20 graft map ./mappings --from Person --to PersonDto --input person.json\n\
            \x20 cat person.json | graft map ./mappings --from Person --to PersonDto\n\
            \x20 graft map ./mappings --from Person --to PersonDto --strict --compact"
    )]
    Map(MapArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 graft completions bash > ~/.local/share/bash-completion/completions/graft\n\
            \x20 graft completions zsh  > ~/.zfunc/_graft\n\
            \x20 graft completions fish > ~/.config/fish/completions/graft.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the graft configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 graft config get mapping.rules\n\
            \x20 graft config list\n\
            \x20 graft config path"
    )]
    Config(ConfigCommands),
}

// ── shared ────────────────────────────────────────────────────────────────────

/// Where the mapping rules come from.
#[derive(Debug, Clone, Args)]
pub struct RulesArgs {
    /// Mapping file or directory of `*.toml` files.
    ///
    /// Falls back to `mapping.rules` from the configuration.
    #[arg(value_name = "RULES", help = "Mapping file or directory")]
    pub rules: Option<PathBuf>,
}

// ── check ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
}

// ── plans ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlansArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Only show the plan for this source type.
    #[arg(long = "from", value_name = "TYPE", requires = "to")]
    pub from: Option<String>,

    /// Only show the plan for this destination type.
    #[arg(long = "to", value_name = "TYPE", requires = "from")]
    pub to: Option<String>,

    /// Mapping context for `--from`/`--to`.
    #[arg(long = "map-id", value_name = "ID", requires = "from")]
    pub map_id: Option<String>,
}

// ── map ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Type of the input document.
    #[arg(long = "from", value_name = "TYPE")]
    pub from: String,

    /// Type to produce.
    #[arg(long = "to", value_name = "TYPE")]
    pub to: String,

    /// Named mapping context.
    #[arg(long = "map-id", value_name = "ID")]
    pub map_id: Option<String>,

    /// Input JSON file; reads stdin when omitted or `-`.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write compact instead of pretty-printed JSON.
    #[arg(long = "compact")]
    pub compact: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `graft completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `graft config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `mapping.rules`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_map_command() {
        let cli = Cli::parse_from([
            "graft", "map", "rules.toml", "--from", "Person", "--to", "PersonDto", "--map-id", "brief",
        ]);
        let Commands::Map(args) = cli.command else {
            panic!("expected Map command");
        };
        assert_eq!(args.rules.rules, Some(PathBuf::from("rules.toml")));
        assert_eq!(args.from, "Person");
        assert_eq!(args.map_id.as_deref(), Some("brief"));
        assert!(args.input.is_none());
    }

    #[test]
    fn rules_path_is_optional() {
        let cli = Cli::parse_from(["graft", "check"]);
        assert!(matches!(cli.command, Commands::Check(CheckArgs { rules: RulesArgs { rules: None } })));
    }

    #[test]
    fn plans_filter_needs_both_types() {
        assert!(Cli::try_parse_from(["graft", "plans", "r.toml", "--from", "A"]).is_err());
        assert!(Cli::try_parse_from(["graft", "plans", "r.toml", "--from", "A", "--to", "B"]).is_ok());
    }

    #[test]
    fn map_requires_types() {
        assert!(Cli::try_parse_from(["graft", "map", "r.toml", "--from", "A"]).is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["graft", "--quiet", "--verbose", "check"]);
        assert!(result.is_err());
    }
}
