//! `graft check`: load mapping files and resolve every declared mapping.

use serde_json::json;
use tracing::instrument;

use crate::{
    cli::CheckArgs,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

use super::open_workspace;

#[instrument(skip_all)]
pub fn execute(args: CheckArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = open_workspace(&args.rules, &config)?;
    let pairs = workspace.mapper.declared_pairs()?;

    let mut results = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let result = workspace.mapper.plan(
            pair.source.clone(),
            pair.destination.clone(),
            pair.map_id.clone(),
        );
        results.push((pair, result));
    }
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if output.is_json() {
        let mappings: Vec<_> = results
            .iter()
            .map(|(pair, result)| match result {
                Ok(plan) => json!({ "pair": pair.to_string(), "ok": true, "bindings": plan.len() }),
                Err(e) => json!({ "pair": pair.to_string(), "ok": false, "error": e.to_string() }),
            })
            .collect();
        let report = json!({
            "files": workspace.loaded.files.len(),
            "types": workspace.loaded.types.len(),
            "mappings": mappings,
        });
        output.data(&serde_json::to_string_pretty(&report).unwrap_or_default())?;
    } else {
        output.header(&format!(
            "Checked {} file(s), {} type(s):",
            workspace.loaded.files.len(),
            workspace.loaded.types.len()
        ))?;
        for (pair, result) in &results {
            match result {
                Ok(plan) => output.success(&format!("{pair}: {} binding(s)", plan.len()))?,
                Err(e) => output.error(&format!("{pair}: {e}"))?,
            }
        }
    }

    if failed > 0 {
        return Err(CliError::CheckFailed {
            failed,
            total: results.len(),
        });
    }
    if !output.is_json() {
        output.success(&format!("All {} mapping(s) resolve", results.len()))?;
    }
    Ok(())
}
