//! Error taxonomy shared by every stage of the pipeline.
//!
//! Failures come in two tiers:
//!
//! - **Fatal** errors abort the current read/synthesize/assemble call and are
//!   returned as `Err(ModlitError)`.
//! - **Non-fatal** conditions are collected as [`Diagnostic`]s and returned
//!   alongside successful output.
//!
//! `UnknownNativeType`, `DanglingReference` and `EmptyBundle` exist in both
//! forms: the registry and assembler raise them as errors, and the caller
//! that can recover downgrades them with [`Diagnostic::downgrade`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::SettingsError;
use crate::types::TypeMapping;

/// Result type for modlit operations.
pub type Result<T> = std::result::Result<T, ModlitError>;

/// Boxed error returned by catalog drivers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while reading a catalog or synthesizing models.
#[derive(Error, Debug)]
pub enum ModlitError {
    /// The catalog connection failed (I/O, driver or query error).
    #[error("catalog connection failed while {context}: {source}")]
    Connection {
        /// What the reader was doing when the failure happened.
        context: String,
        #[source]
        source: BoxError,
    },

    /// The catalog returned missing or contradictory metadata.
    #[error("malformed catalog metadata{}: {reason}", location(.table, .column))]
    MalformedCatalogMetadata {
        table: Option<String>,
        column: Option<String>,
        reason: String,
    },

    /// No type mapping is registered for a native type.
    #[error("unknown native type '{native_type}'{}", location(.table, .column))]
    UnknownNativeType {
        native_type: String,
        table: Option<String>,
        column: Option<String>,
    },

    /// A native type is already registered with a different mapping.
    #[error("native type '{native_type}' is already mapped to {existing}, refusing {attempted}")]
    DuplicateTypeMapping {
        native_type: String,
        existing: TypeMapping,
        attempted: TypeMapping,
    },

    /// Two source tables derive the same model name.
    #[error("tables '{first_table}' and '{second_table}' both map to model '{model}'")]
    NameCollision {
        model: String,
        first_table: String,
        second_table: String,
    },

    /// A foreign key points at a model that is not available.
    #[error("'{table}.{column}' references '{target}', which has no model")]
    DanglingReference {
        table: String,
        column: String,
        /// Target as `table.column` (or `table.<pk>` when implicit).
        target: String,
    },

    /// A declared module received no models.
    #[error("module '{module}' contains no models")]
    EmptyBundle { module: String },

    /// Settings could not be loaded or are invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

fn location(table: &Option<String>, column: &Option<String>) -> String {
    match (table, column) {
        (Some(t), Some(c)) => format!(" at '{}.{}'", t, c),
        (Some(t), None) => format!(" in table '{}'", t),
        (None, Some(c)) => format!(" at column '{}'", c),
        (None, None) => String::new(),
    }
}

impl ModlitError {
    /// Wrap a driver error as a connection failure.
    pub fn connection(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a malformed-metadata error scoped to a table (and optionally a column).
    pub fn malformed(
        table: Option<&str>,
        column: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedCatalogMetadata {
            table: table.map(str::to_string),
            column: column.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Check if this error must abort the current operation.
    ///
    /// Non-fatal errors are expected to be downgraded to diagnostics by the
    /// stage that raised them.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnknownNativeType { .. }
                | Self::DanglingReference { .. }
                | Self::EmptyBundle { .. }
        )
    }
}

/// Severity of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; output is complete.
    Info,
    /// Output was produced but is partial or degraded.
    Warning,
}

/// The recoverable condition a diagnostic reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A column was mapped to an opaque attribute.
    UnknownNativeType {
        table: String,
        column: String,
        native_type: String,
    },
    /// A foreign key could not be tied to a model.
    DanglingReference {
        table: String,
        column: String,
        target: String,
    },
    /// A declared module was empty and omitted.
    EmptyBundle { module: String },
}

/// A structured, non-fatal report produced during synthesis or assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a warning diagnostic.
    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }

    /// Create an informational diagnostic.
    pub fn info(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Info,
            kind,
        }
    }

    /// Convert a non-fatal error into a diagnostic.
    ///
    /// Fatal errors are handed back unchanged so the caller can propagate them.
    pub fn downgrade(err: ModlitError) -> std::result::Result<Self, ModlitError> {
        match err {
            ModlitError::UnknownNativeType {
                native_type,
                table,
                column,
            } => Ok(Self::warning(DiagnosticKind::UnknownNativeType {
                table: table.unwrap_or_default(),
                column: column.unwrap_or_default(),
                native_type,
            })),
            ModlitError::DanglingReference {
                table,
                column,
                target,
            } => Ok(Self::warning(DiagnosticKind::DanglingReference {
                table,
                column,
                target,
            })),
            ModlitError::EmptyBundle { module } => {
                Ok(Self::info(DiagnosticKind::EmptyBundle { module }))
            }
            fatal => Err(fatal),
        }
    }

    /// Check if this diagnostic reports an unknown native type.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self.kind, DiagnosticKind::UnknownNativeType { .. })
    }

    /// Check if this diagnostic reports a dangling reference.
    pub fn is_dangling(&self) -> bool {
        matches!(self.kind, DiagnosticKind::DanglingReference { .. })
    }

    /// Emit this diagnostic as a tracing event.
    pub(crate) fn trace(&self) {
        match self.severity {
            Severity::Warning => tracing::warn!(diagnostic = %self, "synthesis diagnostic"),
            Severity::Info => tracing::info!(diagnostic = %self, "synthesis diagnostic"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        match &self.kind {
            DiagnosticKind::UnknownNativeType {
                table,
                column,
                native_type,
            } => write!(
                f,
                "{}: '{}.{}' has unknown native type '{}', mapped as opaque",
                level, table, column, native_type
            ),
            DiagnosticKind::DanglingReference {
                table,
                column,
                target,
            } => write!(
                f,
                "{}: '{}.{}' references '{}', which has no model",
                level, table, column, target
            ),
            DiagnosticKind::EmptyBundle { module } => {
                write!(f, "{}: module '{}' is empty and was omitted", level, module)
            }
        }
    }
}
