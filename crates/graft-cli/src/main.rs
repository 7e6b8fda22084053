//! # graft CLI
//!
//! `graft check` resolves every mapping in a rules file or directory,
//! `graft plans` prints the field bindings a type pair resolves to, and
//! `graft map` decodes a JSON document as one declared type and prints it
//! mapped to another.
//!
//! Settings come from `--config` (or the platform config file) and
//! `GRAFT_*` variables; `--strict` overrides the rules' strictness for
//! this run only.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! |  0   | Success                                                        |
//! |  1   | I/O failure or a destination that could not be created        |
//! |  2   | Bad input document, conversion failure, missing rules path     |
//! |  3   | Rules path, input file or type name not found                  |
//! |  4   | Invalid rules, failed `check`, unreadable or unknown config    |
//!
//! A non-strict `map` that hits conversion failures still prints the
//! partial document on stdout and exits with 2.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands, GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // `.env` may supply GRAFT_* and RUST_LOG; a missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e.render().ansi());
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }
    debug!(?cli.global, "graft started");

    let verbose = cli.global.verbose > 0;
    let config = match load_config(&cli.global) {
        Ok(config) => config,
        Err(e) => return handle_error(e, verbose, !cli.global.no_color),
    };

    let output = OutputManager::new(&cli.global, &config);
    let colored = output.supports_color();

    match run(cli, config, output) {
        Ok(()) => {
            info!("graft completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose, colored),
    }
}

/// Layered settings with the command-line overrides applied.
fn load_config(global: &GlobalArgs) -> CliResult<AppConfig> {
    let mut config = AppConfig::load(global.config.as_ref()).map_err(|e| CliError::ConfigError {
        message: format!("{e:#}"),
        source: Some(e.into()),
    })?;
    if global.strict {
        config.mapping.strict = Some(true);
    }
    Ok(config)
}

#[instrument(skip_all)]
fn run(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cli.command {
        Commands::Check(cmd) => commands::check::execute(cmd, config, output),
        Commands::Plans(cmd) => commands::plans::execute(cmd, config, output),
        Commands::Map(cmd) => commands::map::execute(cmd, config, output),
        Commands::Completions(cmd) => commands::completions::execute(cmd),
        Commands::Config(cmd) => commands::config::execute(cmd, config, output),
    }
}

/// Print `err` on stderr and turn its category into the exit code.
fn handle_error(err: CliError, verbose: bool, colored: bool) -> ExitCode {
    err.log();

    let msg = if colored && std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_version_matches_cargo() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn strict_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["graft", "check", "rules.toml", "--strict"]).unwrap();
        assert!(cli.global.strict);
    }

    #[test]
    fn strict_flag_overrides_the_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[mapping]\nstrict = false\n").unwrap();

        let relaxed = GlobalArgs {
            config: Some(path.clone()),
            ..GlobalArgs::default()
        };
        assert_eq!(load_config(&relaxed).unwrap().mapping.strict, Some(false));

        let strict = GlobalArgs {
            config: Some(path),
            strict: true,
            ..GlobalArgs::default()
        };
        assert_eq!(load_config(&strict).unwrap().mapping.strict, Some(true));
    }

    #[test]
    fn unreadable_config_is_a_configuration_error() {
        let args = GlobalArgs {
            config: Some("/definitely/not/here.toml".into()),
            ..GlobalArgs::default()
        };
        let err = load_config(&args).unwrap_err();
        assert!(matches!(err, CliError::ConfigError { .. }));
        assert_eq!(err.exit_code(), 4);
    }
}
