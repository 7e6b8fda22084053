//! Tracing subscriber for the `graft` binary.
//!
//! The library crates only emit events: `graft_core` logs mapper
//! initialization and plan builds, `graft_adapters` logs rule loading and
//! the mapping listener's per-call events. This module decides which of them
//! reach stderr.
//!
//! `-v`/`-q` pick one level for every graft target; `RUST_LOG` replaces the
//! whole filter when set.

use std::io::IsTerminal as _;

use tracing_subscriber::{EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::GlobalArgs;

/// Log targets of the graft crates; everything else stays at the default.
const TARGETS: &[&str] = &["graft", "graft_core", "graft_adapters"];

/// Install the stderr subscriber. Fails if one is already registered.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level(args))));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(args.verbose > 2)
        .without_time()
        .with_ansi(!args.no_color && std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))
}

fn directives(level: LevelFilter) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `--quiet` wins over `-v`; the default shows warnings, which is where
/// non-strict conversion failures land.
fn level(args: &GlobalArgs) -> LevelFilter {
    if args.quiet {
        return LevelFilter::ERROR;
    }
    match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(verbose: u8, quiet: bool) -> GlobalArgs {
        GlobalArgs {
            verbose,
            quiet,
            ..GlobalArgs::default()
        }
    }

    #[test]
    fn warnings_by_default() {
        assert_eq!(level(&args(0, false)), LevelFilter::WARN);
    }

    #[test]
    fn each_verbose_flag_raises_the_level() {
        let levels: Vec<_> = (1..=4).map(|v| level(&args(v, false))).collect();
        assert_eq!(
            levels,
            [LevelFilter::INFO, LevelFilter::DEBUG, LevelFilter::TRACE, LevelFilter::TRACE]
        );
    }

    #[test]
    fn quiet_only_reports_errors() {
        assert_eq!(level(&args(0, true)), LevelFilter::ERROR);
        assert_eq!(level(&args(3, true)), LevelFilter::ERROR);
    }

    #[test]
    fn strict_does_not_change_the_level() {
        let strict = GlobalArgs {
            strict: true,
            ..GlobalArgs::default()
        };
        assert_eq!(level(&strict), LevelFilter::WARN);
    }

    #[test]
    fn every_graft_crate_gets_a_directive() {
        let directives = directives(LevelFilter::DEBUG);
        assert_eq!(directives.split(',').count(), TARGETS.len());
        for target in TARGETS {
            assert!(directives.contains(&format!("{target}=")));
        }
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
