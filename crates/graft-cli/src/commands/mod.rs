//! Command handlers, one module per subcommand.

use std::sync::Arc;

use graft_adapters::{LoadedRules, TomlRuleLoader, TracingListener};
use graft_core::{
    application::{ConversionContext, FnConverter, Mapper},
    domain::{GlobalConfiguration, RuleSet, Value},
};
use tracing::debug;

use crate::{
    cli::RulesArgs,
    config::{AppConfig, MappingConfig},
    error::{CliError, CliResult},
};

pub mod check;
pub mod completions;
pub mod config;
pub mod map;
pub mod plans;

type NamedConverter = fn(&Value, &mut ConversionContext<'_>) -> Result<Value, String>;

/// Converters mapping files can reference by id (`converter = "trim"`).
const NAMED_CONVERTERS: &[(&str, NamedConverter)] = &[
    ("uppercase", uppercase),
    ("lowercase", lowercase),
    ("trim", trim),
];

fn uppercase(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    map_text(value, str::to_uppercase)
}

fn lowercase(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    map_text(value, str::to_lowercase)
}

fn trim(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    map_text(value, |s| s.trim().to_owned())
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Str(s) => Ok(Value::Str(f(s))),
        other => Err(format!("expected string, found {}", other.kind_name())),
    }
}

/// Loaded mapping files plus a mapper configured from them.
pub struct Workspace {
    pub loaded: LoadedRules,
    pub mapper: Mapper,
}

/// Load the rules named on the command line (or in the config) and build a
/// mapper over them.
pub fn open_workspace(args: &RulesArgs, config: &AppConfig) -> CliResult<Workspace> {
    let path = args
        .rules
        .clone()
        .or_else(|| config.mapping.rules.clone())
        .ok_or(CliError::NoRules)?;
    if !path.exists() {
        return Err(CliError::RulesNotFound { path });
    }

    let loaded = TomlRuleLoader::new(&path).load_all()?;
    let catalog = loaded.catalog()?;
    debug!(
        files = loaded.files.len(),
        types = catalog.len(),
        mappings = loaded.rules.len(),
        "rules loaded"
    );

    let mut builder = Mapper::builder(catalog)
        .rules(with_overrides(&loaded.rules, &config.mapping))
        .listener(Arc::new(TracingListener));
    for (id, converter) in NAMED_CONVERTERS {
        builder = builder.converter_id(*id, FnConverter::new(*converter));
    }

    Ok(Workspace {
        loaded,
        mapper: builder.build(),
    })
}

/// The rules with the config's engine overrides applied on top of their
/// `[configuration]` section.
fn with_overrides(rules: &RuleSet, mapping: &MappingConfig) -> RuleSet {
    let mut rules = rules.clone();
    if let Some(strict) = mapping.strict {
        debug!(strict, "overriding rule strictness");
        rules.configuration = Some(GlobalConfiguration {
            strict,
            ..rules.configuration()
        });
    }
    rules
}
