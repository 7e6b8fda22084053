//! `graft config`: inspect configuration values.

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.data(&value)?;
        }

        ConfigCommands::List => {
            let serialised = if output.is_json() {
                serde_json::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                    message: format!("Failed to serialise config: {e}"),
                    source: Some(Box::new(e)),
                })?
            } else {
                toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                    message: format!("Failed to serialise config: {e}"),
                    source: Some(Box::new(e)),
                })?
            };
            output.header("Current Configuration:")?;
            output.data(&serialised)?;
        }

        ConfigCommands::Path => {
            output.data(&AppConfig::config_path().display().to_string())?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    match key {
        "mapping.rules" => Ok(config
            .mapping
            .rules
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()),
        "mapping.date_format" => Ok(config.mapping.date_format.clone().unwrap_or_default()),
        "mapping.strict" => Ok(config.mapping.strict.map(|s| s.to_string()).unwrap_or_default()),
        "output.no_color" => Ok(config.output.no_color.to_string()),
        "output.format" => Ok(config.output.format.clone()),
        _ => Err(CliError::ConfigError {
            message: format!("Unknown config key: '{key}'"),
            source: None,
        }),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn get_known_keys() {
        let mut cfg = AppConfig::default();
        cfg.mapping.rules = Some(PathBuf::from("mappings"));
        assert_eq!(get_config_value(&cfg, "mapping.rules").unwrap(), "mappings");
        assert_eq!(get_config_value(&cfg, "mapping.date_format").unwrap(), "");
        assert_eq!(get_config_value(&cfg, "mapping.strict").unwrap(), "");
        cfg.mapping.strict = Some(true);
        assert_eq!(get_config_value(&cfg, "mapping.strict").unwrap(), "true");
        assert_eq!(get_config_value(&cfg, "output.no_color").unwrap(), "false");
    }

    #[test]
    fn get_unknown_key_is_error() {
        let cfg = AppConfig::default();
        assert!(matches!(
            get_config_value(&cfg, "does.not.exist"),
            Err(CliError::ConfigError { .. })
        ));
    }
}
