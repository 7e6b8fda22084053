//! Type conversion registry.
//!
//! Converters are keyed by (source type, destination type). Lookup tries the
//! exact pair first, then walks both supertype chains and picks the pair with
//! the smallest combined distance. Converters can also be registered under an
//! id and referenced from field rules.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::{DomainError, ObjectArena, TypeCatalog, TypeName, Value, format_date};

// ── Converter ────────────────────────────────────────────────────────────────

/// Everything a converter may look at besides the value itself.
pub struct ConversionContext<'a> {
    pub arena: &'a mut ObjectArena,
    /// Effective date format of the binding being executed.
    pub date_format: &'a str,
    /// Destination field path, for error messages.
    pub field: &'a str,
}

/// Converts one value. The error string becomes the `reason` of a
/// conversion error.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &Value, ctx: &mut ConversionContext<'_>) -> Result<Value, String>;
}

/// Adapts a closure into a [`Converter`].
pub struct FnConverter<F>(pub F);

impl<F> FnConverter<F>
where
    F: Fn(&Value, &mut ConversionContext<'_>) -> Result<Value, String> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Converter for FnConverter<F>
where
    F: Fn(&Value, &mut ConversionContext<'_>) -> Result<Value, String> + Send + Sync,
{
    fn convert(&self, value: &Value, ctx: &mut ConversionContext<'_>) -> Result<Value, String> {
        (self.0)(value, ctx)
    }
}

/// A registered converter together with the pair it was registered for.
#[derive(Clone)]
pub struct ConversionEntry {
    pub source: TypeName,
    pub destination: TypeName,
    pub converter: Arc<dyn Converter>,
    pub builtin: bool,
}

impl fmt::Debug for ConversionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEntry")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("builtin", &self.builtin)
            .finish()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Built-in plus user converters. Immutable once the mapper is initialized.
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    by_pair: HashMap<(TypeName, TypeName), Arc<ConversionEntry>>,
    by_id: HashMap<String, Arc<dyn Converter>>,
}

impl ConversionRegistry {
    /// Empty registry without built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the scalar built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (source, destination, f) in BUILTINS {
            registry.by_pair.insert(
                (TypeName::new(source), TypeName::new(destination)),
                Arc::new(ConversionEntry {
                    source: TypeName::new(source),
                    destination: TypeName::new(destination),
                    converter: Arc::new(Builtin(*f)),
                    builtin: true,
                }),
            );
        }
        registry
    }

    /// Register a converter for a pair. Replaces any earlier converter for
    /// the same pair, built-in or not.
    pub fn register(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
        converter: Arc<dyn Converter>,
    ) {
        let source = source.into();
        let destination = destination.into();
        debug!(%source, %destination, "Registering converter");
        self.by_pair.insert(
            (source.clone(), destination.clone()),
            Arc::new(ConversionEntry {
                source,
                destination,
                converter,
                builtin: false,
            }),
        );
    }

    /// Register a closure for a pair.
    pub fn register_fn<F>(&mut self, source: impl Into<TypeName>, destination: impl Into<TypeName>, f: F)
    where
        F: Fn(&Value, &mut ConversionContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(source, destination, Arc::new(FnConverter(f)));
    }

    /// Register a converter that field rules reference by id.
    pub fn register_id(&mut self, id: impl Into<String>, converter: Arc<dyn Converter>) {
        self.by_id.insert(id.into(), converter);
    }

    pub fn by_id(&self, id: &str) -> Result<Arc<dyn Converter>, DomainError> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::UnknownConverter { id: id.to_owned() })
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Exact-pair lookup only.
    pub fn exact(&self, source: &TypeName, destination: &TypeName) -> Option<Arc<ConversionEntry>> {
        self.by_pair
            .get(&(source.clone(), destination.clone()))
            .cloned()
    }

    /// Closest converter for `source -> destination`.
    ///
    /// Candidates are every (ancestor of source, ancestor of destination)
    /// pair with a registered converter, scored by the sum of both
    /// distances. Two distinct pairs sharing the lowest score are ambiguous.
    pub fn find(
        &self,
        catalog: &TypeCatalog,
        source: &TypeName,
        destination: &TypeName,
    ) -> Result<Option<Arc<ConversionEntry>>, DomainError> {
        if let Some(entry) = self.exact(source, destination) {
            return Ok(Some(entry));
        }

        let source_chain = catalog.ancestors(source);
        let destination_chain = catalog.ancestors(destination);

        let mut best: Option<usize> = None;
        let mut winners: Vec<Arc<ConversionEntry>> = Vec::new();
        for (s, ds) in &source_chain {
            for (d, dd) in &destination_chain {
                let Some(entry) = self.exact(s, d) else {
                    continue;
                };
                let score = ds + dd;
                match best {
                    Some(b) if score > b => {}
                    Some(b) if score == b => winners.push(entry),
                    _ => {
                        best = Some(score);
                        winners = vec![entry];
                    }
                }
            }
        }

        match winners.len() {
            0 => Ok(None),
            1 => Ok(winners.pop()),
            _ => Err(DomainError::AmbiguousConverter {
                source_type: source.to_string(),
                destination: destination.to_string(),
                candidates: winners
                    .iter()
                    .map(|e| format!("{} -> {}", e.source, e.destination))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .by_pair
            .keys()
            .map(|(s, d)| format!("{s} -> {d}"))
            .collect();
        pairs.sort();
        let mut ids: Vec<&String> = self.by_id.keys().collect();
        ids.sort();
        f.debug_struct("ConversionRegistry")
            .field("pairs", &pairs)
            .field("ids", &ids)
            .finish()
    }
}

// ── Built-ins ────────────────────────────────────────────────────────────────

type BuiltinFn = fn(&Value, &mut ConversionContext<'_>) -> Result<Value, String>;

struct Builtin(BuiltinFn);

impl Converter for Builtin {
    fn convert(&self, value: &Value, ctx: &mut ConversionContext<'_>) -> Result<Value, String> {
        (self.0)(value, ctx)
    }
}

const BUILTINS: &[(&str, &str, BuiltinFn)] = &[
    ("string", "int", string_to_int),
    ("string", "float", string_to_float),
    ("string", "bool", string_to_bool),
    ("string", "date", string_to_date),
    ("int", "string", to_string),
    ("float", "string", to_string),
    ("bool", "string", to_string),
    ("date", "string", date_to_string),
    ("int", "float", int_to_float),
    ("float", "int", float_to_int),
    ("bool", "int", bool_to_int),
];

fn unexpected(expected: &str, value: &Value) -> String {
    format!("expected {expected}, found {}", value.kind_name())
}

fn text(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| unexpected("string", value))
}

fn string_to_int(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    let s = text(value)?;
    s.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| format!("'{s}' is not an integer: {e}"))
}

fn string_to_float(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    let s = text(value)?;
    s.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| format!("'{s}' is not a number: {e}"))
}

fn string_to_bool(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    let s = text(value)?;
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("'{s}' is not a boolean")),
    }
}

fn string_to_date(value: &Value, ctx: &mut ConversionContext<'_>) -> Result<Value, String> {
    let s = text(value)?.trim();
    NaiveDateTime::parse_from_str(s, ctx.date_format)
        .or_else(|_| {
            NaiveDate::parse_from_str(s, ctx.date_format)
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map(Value::Date)
        .map_err(|e| format!("'{s}' does not match date format '{}': {e}", ctx.date_format))
}

fn date_to_string(value: &Value, ctx: &mut ConversionContext<'_>) -> Result<Value, String> {
    match value {
        Value::Date(d) => format_date(d, ctx.date_format)
            .map(Value::Str)
            .ok_or_else(|| format!("date format '{}' cannot render {d}", ctx.date_format)),
        other => Err(unexpected("date", other)),
    }
}

fn to_string(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Str(i.to_string())),
        Value::Float(f) => Ok(Value::Str(f.to_string())),
        Value::Bool(b) => Ok(Value::Str(b.to_string())),
        other => Err(unexpected("int, float or bool", other)),
    }
}

fn int_to_float(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    match value {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        other => Err(unexpected("int", other)),
    }
}

// Truncates toward zero; non-finite and out-of-range values fail.
fn float_to_int(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    match value {
        Value::Float(f) if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
            Ok(Value::Int(f.trunc() as i64))
        }
        Value::Float(f) => Err(format!("{f} does not fit in an integer")),
        other => Err(unexpected("float", other)),
    }
}

fn bool_to_int(value: &Value, _: &mut ConversionContext<'_>) -> Result<Value, String> {
    match value {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        other => Err(unexpected("bool", other)),
    }
}
