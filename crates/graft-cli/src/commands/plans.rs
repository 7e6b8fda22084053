//! `graft plans`: print resolved correspondence plans.

use graft_core::domain::{BindingOrigin, CorrespondencePlan, MapId, TypePair};
use serde_json::{Value as Json, json};
use tracing::instrument;

use crate::{cli::PlansArgs, config::AppConfig, error::CliResult, output::OutputManager};

use super::open_workspace;

#[instrument(skip_all)]
pub fn execute(args: PlansArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = open_workspace(&args.rules, &config)?;

    let pairs = match (args.from, args.to) {
        (Some(from), Some(to)) => vec![TypePair::new(from, to).with_map_id(args.map_id.map(MapId::new))],
        _ => workspace.mapper.declared_pairs()?,
    };

    let mut plans = Vec::with_capacity(pairs.len());
    for pair in pairs {
        plans.push(workspace.mapper.plan(pair.source, pair.destination, pair.map_id)?);
    }

    if output.is_json() {
        let report: Vec<Json> = plans.iter().map(|p| plan_json(p)).collect();
        output.data(&serde_json::to_string_pretty(&report).unwrap_or_default())?;
        return Ok(());
    }

    for plan in &plans {
        output.header(&plan.pair.to_string())?;
        if let Some(rule) = &plan.rule {
            output.print(&format!("  rule: {rule}"))?;
        }
        if plan.is_empty() {
            output.print("  (no bindings)")?;
        }
        for binding in &plan.bindings {
            output.print(&format!("  {binding}"))?;
        }
    }
    Ok(())
}

fn plan_json(plan: &CorrespondencePlan) -> Json {
    let bindings: Vec<Json> = plan
        .bindings
        .iter()
        .map(|b| {
            json!({
                "source": b.source.as_str(),
                "source_shape": b.source.shape().to_string(),
                "destination": b.destination.as_str(),
                "destination_shape": b.destination.shape().to_string(),
                "strategy": b.strategy.to_string(),
                "null_policy": b.null_policy.as_str(),
                "converter": b.converter_id,
                "implicit": b.origin == BindingOrigin::Implicit,
            })
        })
        .collect();
    json!({
        "source": plan.pair.source.as_str(),
        "destination": plan.pair.destination.as_str(),
        "map_id": plan.pair.map_id.as_ref().map(|m| m.as_str()),
        "rule": plan.rule,
        "bindings": bindings,
    })
}
