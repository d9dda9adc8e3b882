use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors: the rule set itself is wrong.
///
/// These are always returned as `Err` and never folded into a [`Report`].
/// A record that merely fails its rules is not an error.
///
/// [`Report`]: crate::types::Report
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The rule string does not have at least a field and a capability.
    #[error(
        "malformed rule '{rule}': it must have at least a field and a validator, e.g. username:not_empty"
    )]
    MalformedRule { rule: String },

    /// No capability is registered under this name.
    #[error("the validator '{name}' does not exist")]
    UnknownCapability { name: String },

    /// A condition on a simple field was evaluated against a record without it.
    #[error("the field '{field}' is not present in the input")]
    MissingField { field: String },

    /// The operand cannot drive this capability (wrong shape or unparseable).
    #[error("invalid value for '{capability}': {message}")]
    InvalidOperand { capability: String, message: String },

    /// The capability was handed an input of a type it cannot inspect.
    #[error("invalid input for '{capability}': {message}")]
    InvalidInput { capability: String, message: String },

    /// Numeric strictness outside `0..=3`.
    #[error("strict level must be between 0 and 3, got {0}")]
    InvalidStrictLevel(i64),
}

impl ConfigError {
    pub(crate) fn operand(capability: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidOperand {
            capability: capability.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn input(capability: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidInput {
            capability: capability.to_string(),
            message: message.into(),
        }
    }
}

/// Diagnostic severity level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A structured, non-fatal message produced while validating a rule-set document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

/// Error kind for document parse failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Syntax,
    TypeMismatch,
    UnknownVariant,
}

/// Produced by [`parse_document`](crate::parse::parse_document) when the YAML
/// cannot be mapped onto a rule-set document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}", display_located(.line, .column, .message))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

fn display_located(line: &Option<usize>, column: &Option<usize>, message: &str) -> String {
    match (line, column) {
        (Some(line), Some(col)) => format!("{}:{}: {}", line, col, message),
        _ => message.to_string(),
    }
}

/// Produced by [`validate`](crate::validate::validate) for each problem found
/// in a rule-set document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{rule} at {path}: {message}")]
pub struct ValidationError {
    pub rule: String,
    pub path: String,
    pub message: String,
}

/// Result of document validation: errors and warnings.
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Serialization error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SerializeError {
    pub message: String,
}

/// Combined error type for the [`load`](crate::load) entry point.
#[derive(Clone, Debug, Error)]
pub enum RulegateError {
    #[error("Parse error: {0}")]
    Parse(ParseError),
    #[error("Validation error: {0}")]
    Validation(ValidationError),
    #[error("Configuration error: {0}")]
    Config(ConfigError),
}
