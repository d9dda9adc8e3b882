//! Conditions: rule-shaped gates evaluated before any validation runs.

use serde_json::Value;
use std::fmt;
use tracing::{trace, warn};

use crate::enums::OperandShape;
use crate::error::ConfigError;
use crate::parse::parse_rule;
use crate::primitives::{as_number, is_dotted, lookup_field, resolve_path};
use crate::registry::{Capability, CapabilityEntry, CapabilityRegistry};
use crate::types::{Operand, Rule};

/// A single gate over a record: a field, a capability and a declared value.
///
/// The capability is resolved when the condition is built. The declared
/// value is never modified; references in it are resolved against each
/// record on every call.
#[derive(Clone, Debug)]
pub struct Condition {
    field: String,
    entry: CapabilityEntry,
    value: Operand,
    message: Option<String>,
    require_field: bool,
}

impl Condition {
    pub fn new(
        field: &str,
        capability: &str,
        value: impl Into<Operand>,
        registry: &CapabilityRegistry,
    ) -> Result<Self, ConfigError> {
        let entry = registry.resolve(capability)?.clone();
        Ok(Condition {
            field: field.to_string(),
            entry,
            value: value.into(),
            message: None,
            require_field: true,
        })
    }

    /// Build from a `field:capability:value:message` rule string.
    pub fn from_rule(rule: &str, registry: &CapabilityRegistry) -> Result<Self, ConfigError> {
        Self::from_parsed(parse_rule(rule, registry)?, registry)
    }

    pub fn from_parsed(rule: Rule, registry: &CapabilityRegistry) -> Result<Self, ConfigError> {
        let entry = registry.resolve(&rule.capability)?.clone();
        Ok(Condition {
            field: rule.field,
            entry,
            value: rule.value,
            message: rule.message,
            require_field: true,
        })
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether a simple (non-dotted) field must be present in the record.
    /// Defaults to `true`; an absent field is then a [`ConfigError::MissingField`].
    pub fn with_require_field(mut self, require: bool) -> Self {
        self.require_field = require;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn capability(&self) -> &str {
        &self.entry.name
    }

    pub fn shape(&self) -> OperandShape {
        self.entry.shape
    }

    /// The declared value, references unresolved.
    pub fn value(&self) -> &Operand {
        &self.value
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn requires_field(&self) -> bool {
        self.require_field
    }

    pub fn to_rule(&self) -> Rule {
        Rule {
            field: self.field.clone(),
            capability: self.entry.name.clone(),
            value: self.value.clone(),
            message: self.message.clone(),
        }
    }

    /// The declared value with references resolved against `input`.
    pub fn resolved_value(&self, input: &Value) -> Operand {
        resolve_references(&self.value, input)
    }

    /// The capability instance this condition runs for `input`.
    pub fn bind(&self, input: &Value) -> Result<Box<dyn Capability>, ConfigError> {
        self.entry
            .bind(&self.field, self.resolved_value(input), self.message.clone())
    }

    /// Run the condition against `input`.
    ///
    /// Field-addressed capabilities get the whole record. Others get the
    /// field's value: for a dotted field the single match, or the list of
    /// matches when there are several. No match is a failure.
    pub fn evaluate(&self, input: &Value) -> Result<bool, ConfigError> {
        let dotted = is_dotted(&self.field);
        if !dotted && self.require_field && input.get(&self.field).is_none() {
            return Err(ConfigError::MissingField {
                field: self.field.clone(),
            });
        }

        let capability = self.bind(input)?;
        let subject = if self.entry.shape.addresses_field() {
            Some(input.clone())
        } else if dotted {
            let mut matches = resolve_path(&self.field, input);
            match matches.len() {
                0 => None,
                1 => matches.pop(),
                _ => Some(Value::Array(matches)),
            }
        } else {
            input.get(&self.field).cloned()
        };

        let passed = match subject {
            Some(subject) => capability.evaluate(&subject)?,
            None => false,
        };
        trace!(
            field = %self.field,
            capability = %self.entry.name,
            passed,
            "condition evaluated"
        );
        Ok(passed)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_rule().fmt(f)
    }
}

// ─── References ─────────────────────────────────────────────────────────────

/// Replace cross-field references in an operand with values from `input`.
///
/// `"[name]"` always denotes a reference; a missing target is left as the
/// literal text. A bare non-numeric string that equals a top-level key of
/// `input` is a reference too. Field operands are never rewritten.
pub fn resolve_references(operand: &Operand, input: &Value) -> Operand {
    match operand {
        Operand::None | Operand::Field(_) => operand.clone(),
        Operand::Scalar(value) => Operand::Scalar(resolve_value(value, input)),
        Operand::List(items) => {
            Operand::List(items.iter().map(|item| resolve_value(item, input)).collect())
        }
        Operand::Keyed { field, value } => Operand::Keyed {
            field: field.clone(),
            value: resolve_value(value, input),
        },
    }
}

fn resolve_value(value: &Value, input: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };

    if let Some(name) = bracket_reference(text) {
        let mut matches = lookup_field(input, name);
        return match matches.len() {
            0 => {
                warn!(reference = %text, "referenced field is not present in the input");
                value.clone()
            }
            1 => matches.pop().unwrap_or(Value::Null),
            _ => Value::Array(matches),
        };
    }

    if as_number(value).is_none()
        && let Some(referenced) = input.get(text.as_str())
    {
        return referenced.clone();
    }
    value.clone()
}

fn bracket_reference(text: &str) -> Option<&str> {
    text.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
