//! Domain value objects: TypeName, MapId, ScalarKind, NullPolicy, ContainerStrategy.
//!
//! # Design
//!
//! These are pure value types: equality-by-value, no identity. Names are
//! `Arc<str>` so that plans, cache keys and visited-set entries can share
//! them without re-allocating on every mapping call. Each enum has a
//! canonical string form (`as_str`) and a `FromStr` parser used by rule
//! loaders.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ── TypeName ──────────────────────────────────────────────────────────────────

/// Identity of a registered type (scalar or bean).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0.to_string()
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── MapId ─────────────────────────────────────────────────────────────────────

/// Named mapping context. Absent means the default context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MapId(Arc<str>);

impl MapId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MapId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<MapId> for String {
    fn from(id: MapId) -> Self {
        id.0.to_string()
    }
}

// ── ScalarKind ────────────────────────────────────────────────────────────────

/// Storage class of a scalar type.
///
/// Built-in scalar types (`bool`, `int`, ...) have one kind each; user scalars
/// such as `email` pick the kind of the value they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
    Date,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 5] = [
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::String,
        Self::Date,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Date => "date",
        }
    }

    /// Name of the built-in type registered for this kind.
    pub fn type_name(&self) -> TypeName {
        TypeName::new(self.as_str())
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Self::Bool),
            "int" | "integer" | "long" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "string" | "str" => Ok(Self::String),
            "date" | "datetime" => Ok(Self::Date),
            other => Err(DomainError::InvalidRule(format!(
                "unknown scalar kind: {other}"
            ))),
        }
    }
}

// ── NullPolicy ────────────────────────────────────────────────────────────────

/// What a binding does when its source value is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullPolicy {
    /// Leave the destination field untouched.
    SkipIfNull,
    /// Write null into the destination field.
    #[default]
    MapNull,
    /// Like `MapNull`, and an empty source string also counts as null.
    MapEmptyStringAsNull,
}

impl NullPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SkipIfNull => "skip-if-null",
            Self::MapNull => "map-null",
            Self::MapEmptyStringAsNull => "map-empty-string-as-null",
        }
    }
}

impl fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NullPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "skip-if-null" | "skip" => Ok(Self::SkipIfNull),
            "map-null" => Ok(Self::MapNull),
            "map-empty-string-as-null" | "empty-as-null" => Ok(Self::MapEmptyStringAsNull),
            other => Err(DomainError::InvalidRule(format!(
                "unknown null policy: {other}"
            ))),
        }
    }
}

// ── ContainerStrategy ─────────────────────────────────────────────────────────

/// How a binding moves its value: as one value, or element by element.
///
/// The tag follows the destination field's declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStrategy {
    Single,
    List,
    Set,
    Array,
    Map,
}

impl ContainerStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::List => "list",
            Self::Set => "set",
            Self::Array => "array",
            Self::Map => "map",
        }
    }

    /// `true` for list, set and array.
    pub const fn is_sequence(self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Array)
    }
}

impl fmt::Display for ContainerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
