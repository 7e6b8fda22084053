//! Unified error handling for graft core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::{ApplicationError, ConversionError};
use crate::domain::DomainError;

/// Root error type for graft core operations.
///
/// Every public mapping entry point returns this type. Configuration errors
/// surface as `Domain`, runtime failures as `Application`.
#[derive(Debug, Error, Clone)]
pub enum GraftError {
    /// Rule set, catalog or input does not describe a valid mapping.
    #[error("Configuration error: {0}")]
    Domain(#[from] DomainError),

    /// Failure while executing a mapping call.
    #[error("Mapping error: {0}")]
    Application(#[from] ApplicationError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl GraftError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug in graft".into(),
                "Please report this issue at: https://github.com/cosecruz/graft/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(_) => ErrorCategory::Configuration,
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// `true` for rule/catalog problems that are fixed by editing rules.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Application(ApplicationError::RuleLoading { .. })
                | Self::Application(ApplicationError::LockPoisoned)
        )
    }

    /// Conversion failures carried by this error, if any.
    pub fn conversion_failures(&self) -> &[ConversionError] {
        match self {
            Self::Application(ApplicationError::Conversion(e)) => std::slice::from_ref(e),
            Self::Application(ApplicationError::ConversionFailures { failures, .. }) => failures,
            _ => &[],
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Conversion,
    Creation,
    Usage,
    Internal,
}

/// Convenient result type alias.
pub type GraftResult<T> = Result<T, GraftError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> GraftResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> GraftResult<T> {
        self.map_err(|e| GraftError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_configuration() {
        let err: GraftError = DomainError::UnknownType { name: "X".into() }.into();
        assert!(err.is_configuration());
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn rule_loading_is_retryable() {
        let err: GraftError = ApplicationError::RuleLoading {
            source_name: "rules.toml".into(),
            reason: "missing".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert!(err.is_configuration());
    }

    #[test]
    fn conversion_failures_are_exposed() {
        let failure = ConversionError::new("age", "string", "int", "invalid digit");
        let err: GraftError = ApplicationError::ConversionFailures {
            failures: vec![failure.clone()],
            destination: None,
        }
        .into();
        assert_eq!(err.conversion_failures(), &[failure]);
        assert_eq!(err.category(), ErrorCategory::Conversion);
    }

    #[test]
    fn context_wraps_as_internal() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = io.context("reading").unwrap_err();
        assert!(matches!(err, GraftError::Internal { message } if message.contains("boom")));
    }
}
