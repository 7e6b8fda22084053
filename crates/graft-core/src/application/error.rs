//! Application layer errors.
//!
//! These errors represent failures while executing a mapping call, not
//! problems with the rules themselves. Rule and catalog problems are
//! `DomainError` from `crate::domain`.

use std::fmt;

use thiserror::Error;

use crate::domain::ObjectId;
use crate::error::ErrorCategory;

/// A single value that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    /// Destination field path, prefixed by the enclosing fields for nested
    /// objects (e.g. `address.zip`).
    pub field: String,
    pub source_type: String,
    pub destination_type: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(
        field: impl Into<String>,
        source_type: impl Into<String>,
        destination_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            source_type: source_type.into(),
            destination_type: destination_type.into(),
            reason: reason.into(),
        }
    }

    /// Same failure seen from one level up the object graph.
    pub fn nested_under(mut self, parent: &str) -> Self {
        self.field = format!("{parent}.{}", self.field);
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': cannot convert {} to {}: {}",
            self.field, self.source_type, self.destination_type, self.reason
        )
    }
}

/// Errors that occur while executing a mapping.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A value could not be converted (strict mode, first failure).
    #[error("Conversion failed: {0}")]
    Conversion(ConversionError),

    /// One or more values could not be converted; every other field was
    /// still mapped into `destination`.
    #[error("{} field(s) failed to convert: {}", .failures.len(), summarize(.failures))]
    ConversionFailures {
        failures: Vec<ConversionError>,
        destination: Option<ObjectId>,
    },

    /// The object factory could not create a destination instance.
    #[error("Cannot create '{type_name}': {reason}")]
    Creation { type_name: String, reason: String },

    /// Configuration was changed after the first mapping call.
    #[error("Mapper is already initialized; configure it before the first map call")]
    AlreadyInitialized,

    /// A rule source failed while loading.
    #[error("Failed to load rules from {source_name}: {reason}")]
    RuleLoading { source_name: String, reason: String },

    /// A shared lock was poisoned by a panicking thread.
    #[error("Mapper state lock poisoned")]
    LockPoisoned,
}

fn summarize(failures: &[ConversionError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Conversion(e) => vec![
                format!("Check the value of '{}'", e.field),
                format!(
                    "Register a converter from {} to {}",
                    e.source_type, e.destination_type
                ),
            ],
            Self::ConversionFailures { failures, .. } => failures
                .iter()
                .map(|e| format!("Check the value of '{}'", e.field))
                .chain(std::iter::once(
                    "Enable strict mode to stop at the first failure".into(),
                ))
                .collect(),
            Self::Creation { type_name, .. } => vec![
                format!("Check the object factory registered for '{}'", type_name),
            ],
            Self::AlreadyInitialized => vec![
                "Add rule sources, converters and listeners before calling map".into(),
                "Or build a new mapper with the extra configuration".into(),
            ],
            Self::RuleLoading { source_name, .. } => vec![
                format!("Check the rule source: {}", source_name),
                "The next map call retries loading".into(),
            ],
            Self::LockPoisoned => vec!["A previous mapping call panicked".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Conversion(_) | Self::ConversionFailures { .. } => ErrorCategory::Conversion,
            Self::Creation { .. } => ErrorCategory::Creation,
            Self::AlreadyInitialized => ErrorCategory::Usage,
            Self::RuleLoading { .. } => ErrorCategory::Configuration,
            Self::LockPoisoned => ErrorCategory::Internal,
        }
    }
}
