//! `graft map`: decode a JSON document, map it, and print the result.

use std::{
    fs,
    io::{self, Read as _},
    path::Path,
};

use graft_adapters::{JsonCodec, JsonError};
use graft_core::{
    application::ApplicationError,
    domain::{ObjectArena, ObjectId},
    error::GraftError,
};
use tracing::{info, instrument};

use crate::{
    cli::MapArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

use super::open_workspace;

#[instrument(skip_all, fields(from = %args.from, to = %args.to))]
pub fn execute(args: MapArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let workspace = open_workspace(&args.rules, &config)?;
    let text = read_input(args.input.as_deref())?;
    if text.trim().is_empty() {
        return Err(CliError::InvalidInput {
            message: "input document is empty".into(),
            source: None,
        });
    }

    let date_format = config
        .mapping
        .date_format
        .clone()
        .unwrap_or_else(|| workspace.loaded.rules.configuration().date_format);
    let codec = JsonCodec::new(workspace.mapper.catalog()).with_date_format(date_format);

    let mut arena = ObjectArena::new();
    let source = codec.decode_str(&mut arena, &args.from, &text)?;

    let mapper = &workspace.mapper;
    let result = match args.map_id {
        Some(id) => mapper.map_with_id(&mut arena, Some(source), args.to.as_str(), id),
        None => mapper.map(&mut arena, Some(source), args.to.as_str()),
    };

    match result {
        Ok(Some(destination)) => {
            write_document(&codec, &arena, destination, args.compact, &output)?;
            info!(objects = arena.len(), "document mapped");
            Ok(())
        }
        Ok(None) => {
            output.data("null")?;
            Ok(())
        }
        Err(err) => {
            // Non-strict mode still produced a destination; print it before failing.
            if let Some(destination) = partial_destination(&err) {
                for failure in err.conversion_failures() {
                    output.warning(&failure.to_string())?;
                }
                write_document(&codec, &arena, destination, args.compact, &output)?;
            }
            Err(err.into())
        }
    }
}

fn partial_destination(err: &GraftError) -> Option<ObjectId> {
    match err {
        GraftError::Application(ApplicationError::ConversionFailures { destination, .. }) => *destination,
        _ => None,
    }
}

fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        None => read_stdin(),
        Some(p) if p == Path::new("-") => read_stdin(),
        Some(p) => {
            if !p.exists() {
                return Err(CliError::InputNotFound { path: p.to_path_buf() });
            }
            fs::read_to_string(p).with_cli_context(|| format!("failed to read {}", p.display()))
        }
    }
}

fn read_stdin() -> CliResult<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .with_cli_context(|| "failed to read stdin")?;
    Ok(text)
}

fn write_document(
    codec: &JsonCodec<'_>,
    arena: &ObjectArena,
    id: ObjectId,
    compact: bool,
    output: &OutputManager,
) -> CliResult<()> {
    let document = codec.encode(arena, id)?;
    let text = if compact {
        serde_json::to_string(&document)
    } else {
        serde_json::to_string_pretty(&document)
    }
    .map_err(JsonError::from)?;
    output.data(&text)?;
    Ok(())
}
