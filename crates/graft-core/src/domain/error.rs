// ============================================================================
// domain/error.rs - CONFIGURATION ERROR DOMAIN
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// Every variant is a configuration error: the rule set, the type catalog or
/// the caller's input does not describe a mapping the engine can carry out.
/// They are raised when the offending type pair is first resolved and are
/// never deferred to a later call.
///
/// All errors are:
/// - Cloneable (cached failures are handed to every waiting caller)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Malformed input
    // ========================================================================
    #[error("Invalid mapping rule: {0}")]
    InvalidRule(String),

    #[error("Type '{name}' is declared more than once")]
    DuplicateType { name: String },

    #[error("Conflicting global configuration: {0}")]
    ConflictingConfiguration(String),

    // ========================================================================
    // Unresolvable references
    // ========================================================================
    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("No converter registered with id '{id}'")]
    UnknownConverter { id: String },

    #[error("No mapping with map-id '{map_id}' for {source_type} -> {destination}")]
    UnknownMapId {
        map_id: String,
        source_type: String,
        destination: String,
    },

    #[error("Object #{id} does not exist in the arena")]
    UnknownObject { id: usize },

    // ========================================================================
    // Ambiguity
    // ========================================================================
    #[error("Ambiguous mapping rules for {source_type} -> {destination}: {candidates}")]
    AmbiguousRule {
        source_type: String,
        destination: String,
        candidates: String,
    },

    #[error("Ambiguous converters for {source_type} -> {destination}: {candidates}")]
    AmbiguousConverter {
        source_type: String,
        destination: String,
        candidates: String,
    },

    // ========================================================================
    // Shape mismatches
    // ========================================================================
    #[error("Field '{field}': cannot bind {source_shape} to {destination_shape}")]
    IncompatibleShapes {
        field: String,
        source_shape: String,
        destination_shape: String,
    },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidRule(msg) => vec![
                "Check the mapping rule definitions".into(),
                format!("Details: {}", msg),
            ],
            Self::DuplicateType { name } => vec![
                format!("'{}' is defined by more than one source", name),
                "Keep a single [[types]] entry per type name".into(),
            ],
            Self::UnknownType { name } => vec![
                format!("Register '{}' in the type catalog", name),
                "Type names are case-sensitive".into(),
            ],
            Self::UnknownField { type_name, field } => vec![
                format!("'{}' declares no field named '{}'", type_name, field),
                "Deep paths use dots, e.g. address.city".into(),
            ],
            Self::UnknownConverter { id } => vec![
                format!("Register a converter with id '{}' before the first map call", id),
            ],
            Self::UnknownMapId { map_id, .. } => vec![
                format!("Declare a mapping with map-id = \"{}\"", map_id),
                "Or call map without a map-id".into(),
            ],
            Self::AmbiguousRule { candidates, .. } => vec![
                format!("Candidates: {}", candidates),
                "Add a rule for the exact type pair".into(),
                "Or give the overlapping rules distinct map-ids".into(),
            ],
            Self::AmbiguousConverter { candidates, .. } => vec![
                format!("Candidates: {}", candidates),
                "Register a converter for the exact type pair".into(),
            ],
            Self::IncompatibleShapes { field, .. } => vec![
                format!("Field '{}' mixes a container and a single value", field),
                "Reference a converter with converter-id on the field rule".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRule(_) | Self::DuplicateType { .. } | Self::ConflictingConfiguration(_) => {
                ErrorCategory::Validation
            }
            Self::AmbiguousRule { .. } | Self::AmbiguousConverter { .. } => {
                ErrorCategory::Ambiguity
            }
            Self::IncompatibleShapes { .. } => ErrorCategory::Compatibility,
            Self::UnknownType { .. }
            | Self::UnknownField { .. }
            | Self::UnknownConverter { .. }
            | Self::UnknownMapId { .. }
            | Self::UnknownObject { .. } => ErrorCategory::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Ambiguity,
    Compatibility,
    NotFound,
}
