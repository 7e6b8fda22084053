//! Error handling for the graft CLI.
//!
//! Provides structured errors with:
//! - User-friendly messages
//! - Actionable suggestions
//! - Exit code mapping

use std::path::PathBuf;
use std::{error::Error, fmt::Write as _};

use owo_colors::OwoColorize;
use thiserror::Error;

use graft_adapters::JsonError;
use graft_core::{
    domain::ErrorCategory as DomainCategory,
    error::{ErrorCategory as CoreCategory, GraftError},
};

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input (validation failed).
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No rules path on the command line or in the configuration.
    #[error("No mapping rules given")]
    NoRules,

    #[error("Mapping rules not found at {path}")]
    RulesNotFound { path: PathBuf },

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// `graft check` found mappings that do not resolve.
    #[error("{failed} of {total} mappings failed to resolve")]
    CheckFailed { failed: usize, total: usize },

    // ── Config errors ──────────────────────────────────────────────────────
    /// A configuration file could not be read or parsed, or a key is unknown.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ── Library errors ─────────────────────────────────────────────────────
    #[error(transparent)]
    Core(#[from] GraftError),

    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    // ── System errors ──────────────────────────────────────────────────────
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { message, .. } => vec![
                format!("Check your input: {}", message),
                "Use --help for usage information".into(),
            ],

            Self::NoRules => vec![
                "Pass a mapping file or directory: graft check ./mappings".into(),
                "Or set mapping.rules in the config file".into(),
                "Or set GRAFT_MAPPING__RULES in the environment".into(),
            ],

            Self::RulesNotFound { path } => vec![
                format!("Check that '{}' exists", path.display()),
                "Mapping rules are a .toml file or a directory of them".into(),
            ],

            Self::InputNotFound { path } => vec![
                format!("Check that '{}' exists", path.display()),
                "Omit --input to read the document from stdin".into(),
            ],

            Self::CheckFailed { .. } => vec![
                "Fix the mappings reported above".into(),
                "Use graft plans to inspect the ones that resolve".into(),
            ],

            Self::ConfigError { message, .. } => vec![
                format!("Configuration issue: {}", message),
                "Show the config file location: graft config path".into(),
            ],

            Self::Core(core_err) => core_err.suggestions(),

            Self::Json(_) => vec![
                "Check the input document against the --from type".into(),
                "Field names must match the declared type's fields".into(),
            ],

            Self::IoError { message, .. } => vec![
                format!("I/O operation failed: {}", message),
                "Check file permissions".into(),
            ],
        }
    }

    /// Get the error category for styling and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::NoRules | Self::Json(_) => ErrorCategory::UserError,
            Self::RulesNotFound { .. } | Self::InputNotFound { .. } => ErrorCategory::NotFound,
            Self::CheckFailed { .. } | Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::Core(core) => core_category(core),
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    /// Exit code to pass to the OS.
    ///
    /// | Category      | Code |
    /// |---------------|------|
    /// | User error    |  2   |
    /// | Not found     |  3   |
    /// | Configuration |  4   |
    /// | Internal      |  1   |
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
            ErrorCategory::Internal => 1,
        }
    }

    /// Format the error for display with colors and suggestions.
    pub fn format_colored(&self, verbose: bool) -> String {
        let mut output = String::new();

        let _ = write!(output, "\n{} {}\n\n", "✗".red().bold(), "Error:".red().bold());
        let _ = writeln!(output, "  {}", self.to_string().red());

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                let _ = writeln!(output, "\n  {} {}", "→".dimmed(), err.to_string().dimmed());
                source = err.source();
            }
        }

        self.write_failures(&mut output);

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(output, "\n{}", "Suggestions:".yellow().bold());
            for suggestion in suggestions {
                let _ = writeln!(output, "  {}", suggestion);
            }
        }

        if !verbose {
            let _ = writeln!(
                output,
                "\n{} {}",
                "\u{2139}".blue(),
                "Use -v / --verbose for more details.".dimmed(),
            );
        }

        output
    }

    /// Plain-text version of [`Self::format_colored`], no ANSI codes.
    pub fn format_plain(&self, verbose: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nError: {}", self);

        if verbose {
            let mut src = self.source();
            while let Some(err) = src {
                let _ = writeln!(out, "  Caused by: {err}");
                src = err.source();
            }
        }

        self.write_failures(&mut out);

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for s in &suggestions {
                let _ = writeln!(out, "  {s}");
            }
        }

        if !verbose {
            out.push_str("\nUse -v / --verbose for more details.\n");
        }

        out
    }

    /// One line per conversion failure carried by a core error.
    fn write_failures(&self, out: &mut String) {
        let Self::Core(core) = self else {
            return;
        };
        let failures = core.conversion_failures();
        if failures.len() > 1 {
            out.push_str("\nFailures:\n");
            for failure in failures {
                let _ = writeln!(out, "  {failure}");
            }
        }
    }

    /// Log the error using tracing.
    pub fn log(&self) {
        match self.category() {
            ErrorCategory::UserError => tracing::warn!("User error: {}", self),
            ErrorCategory::NotFound => tracing::warn!("Not found: {}", self),
            ErrorCategory::Configuration => tracing::error!("Configuration error: {}", self),
            ErrorCategory::Internal => tracing::error!("Internal error: {}", self),
        }

        if let Some(source) = self.source() {
            tracing::debug!("Caused by: {}", source);
        }
    }
}

fn core_category(err: &GraftError) -> ErrorCategory {
    if matches!(err, GraftError::Domain(d) if d.category() == DomainCategory::NotFound) {
        return ErrorCategory::NotFound;
    }
    match err.category() {
        CoreCategory::Configuration => ErrorCategory::Configuration,
        CoreCategory::Conversion | CoreCategory::Usage => ErrorCategory::UserError,
        CoreCategory::Creation | CoreCategory::Internal => ErrorCategory::Internal,
    }
}

/// Error categories for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User input error (validation, invalid arguments).
    UserError,
    /// Resource not found.
    NotFound,
    /// Configuration error (config file or mapping rules).
    Configuration,
    /// Internal/system error.
    Internal,
}

// ── IntoCli trait ─────────────────────────────────────────────────────────────

/// Extension trait to convert foreign error types into [`CliError`] at
/// call-sites with a descriptive context message.
pub trait IntoCli<T> {
    /// Convert to `CliResult` attaching a human-readable context message.
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::{
        application::{ApplicationError, ConversionError},
        domain::DomainError,
    };
    use std::io;

    // ── exit codes ────────────────────────────────────────────────────────

    #[test]
    fn exit_code_user_error() {
        assert_eq!(CliError::NoRules.exit_code(), 2);
    }

    #[test]
    fn exit_code_not_found() {
        assert_eq!(
            CliError::RulesNotFound {
                path: PathBuf::from("rules")
            }
            .exit_code(),
            3
        );
        let unknown: GraftError = DomainError::UnknownType { name: "Ghost".into() }.into();
        assert_eq!(CliError::Core(unknown).exit_code(), 3);
    }

    #[test]
    fn exit_code_configuration() {
        let ambiguous: GraftError = DomainError::AmbiguousRule {
            source_type: "A".into(),
            destination: "B".into(),
            candidates: "X, Y".into(),
        }
        .into();
        assert_eq!(CliError::Core(ambiguous).exit_code(), 4);
        assert_eq!(CliError::CheckFailed { failed: 1, total: 2 }.exit_code(), 4);
    }

    #[test]
    fn conversion_failures_are_user_errors_and_listed() {
        let err = CliError::Core(
            ApplicationError::ConversionFailures {
                failures: vec![
                    ConversionError::new("age", "string", "int", "invalid digit"),
                    ConversionError::new("born", "string", "date", "bad format"),
                ],
                destination: None,
            }
            .into(),
        );
        assert_eq!(err.exit_code(), 2);
        let text = err.format_plain(false);
        assert!(text.contains("Failures:"));
        assert!(text.contains("born"));
    }

    #[test]
    fn exit_code_internal() {
        assert_eq!(
            CliError::IoError {
                message: "x".into(),
                source: io::Error::other("e"),
            }
            .exit_code(),
            1
        );
    }

    // ── format ────────────────────────────────────────────────────────────

    #[test]
    fn format_plain_contains_error_header() {
        let s = CliError::NoRules.format_plain(false);
        assert!(s.contains("Error:"));
        assert!(s.contains("Suggestions:"));
        assert!(s.contains("--verbose"));
    }

    #[test]
    fn format_plain_verbose_shows_causes() {
        let err = CliError::ConfigError {
            message: "bad file".into(),
            source: Some(Box::new(io::Error::other("disk on fire"))),
        };
        let s = err.format_plain(true);
        assert!(s.contains("Caused by: disk on fire"));
        assert!(!s.contains("--verbose"));
    }

    // ── IntoCli ───────────────────────────────────────────────────────────

    #[test]
    fn into_cli_io_error() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let cli: CliResult<()> = result.with_cli_context(|| "reading input");
        assert!(matches!(cli, Err(CliError::IoError { message, .. }) if message == "reading input"));
    }
}
