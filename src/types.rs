use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::enums::*;
use crate::registry::title_case_to_snake_case;

// ─── Operand ────────────────────────────────────────────────────────────────

/// The value a capability compares against.
///
/// Which variant a rule produces is decided by the capability's
/// [`OperandShape`], not by the value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Operand {
    /// No value segment was given.
    #[default]
    None,
    Scalar(Value),
    /// Comma-separated rule values, or a JSON array.
    List(Vec<Value>),
    /// `{field: value}` for capabilities that inspect a named field.
    Keyed { field: String, value: Value },
    /// The field name itself, for capabilities that inspect the field's contents.
    Field(String),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Operand::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Operand::List(items) => Some(items),
            _ => None,
        }
    }

    /// The field a field-addressed operand points at.
    pub fn target_field(&self) -> Option<&str> {
        match self {
            Operand::Keyed { field, .. } | Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Reshapes a raw operand for a capability of the given shape bound to `field`.
    ///
    /// Already-shaped operands are kept, so shaping is idempotent. For
    /// field-keyed capabilities a single-entry map `{other: value}` names the
    /// field explicitly.
    pub fn shaped(self, shape: OperandShape, field: &str) -> Operand {
        match shape {
            OperandShape::Scalar => self,
            OperandShape::FieldKeyed => match self {
                keyed @ Operand::Keyed { .. } => keyed,
                Operand::Scalar(Value::Object(map)) if map.len() == 1 => {
                    let (field, value) = map.into_iter().next().unwrap_or_default();
                    Operand::Keyed { field, value }
                }
                Operand::None => Operand::Keyed {
                    field: field.to_string(),
                    value: Value::Null,
                },
                Operand::Scalar(value) => Operand::Keyed {
                    field: field.to_string(),
                    value,
                },
                Operand::List(items) => Operand::Keyed {
                    field: field.to_string(),
                    value: Value::Array(items),
                },
                Operand::Field(name) => Operand::Keyed {
                    field: name,
                    value: Value::Null,
                },
            },
            OperandShape::FieldName => match self {
                named @ Operand::Field(_) => named,
                _ => Operand::Field(field.to_string()),
            },
        }
    }

    /// JSON rendering: `null`, the scalar, an array, `{field: value}`, or the field name.
    pub fn to_value(&self) -> Value {
        match self {
            Operand::None => Value::Null,
            Operand::Scalar(v) => v.clone(),
            Operand::List(items) => Value::Array(items.clone()),
            Operand::Keyed { field, value } => {
                let mut map = serde_json::Map::new();
                map.insert(field.clone(), value.clone());
                Value::Object(map)
            }
            Operand::Field(name) => Value::String(name.clone()),
        }
    }

    /// DSL rendering of the value segment, empty for operands that have none.
    pub fn to_rule_segment(&self) -> String {
        match self {
            Operand::None | Operand::Field(_) => String::new(),
            Operand::Scalar(v) => scalar_text(v),
            Operand::List(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
            Operand::Keyed { value, .. } => match value {
                Value::Null => String::new(),
                Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
                other => scalar_text(other),
            },
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Operand::None,
            Value::Array(items) => Operand::List(items),
            other => Operand::Scalar(other),
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Scalar(Value::String(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Scalar(Value::from(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Scalar(Value::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Scalar(Value::from(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Scalar(Value::Bool(value))
    }
}

impl From<Vec<Value>> for Operand {
    fn from(items: Vec<Value>) -> Self {
        Operand::List(items)
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

// ─── Rule ───────────────────────────────────────────────────────────────────

/// A parsed rule: a field bound to a capability and its operand.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rule {
    pub field: String,
    /// Canonical registered (TitleCase) capability name.
    pub capability: String,
    pub value: Operand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.field,
            title_case_to_snake_case(&self.capability)
        )?;
        let value = self.value.to_rule_segment();
        match (&self.message, value.is_empty()) {
            (Some(message), _) => write!(f, ":{}:{}", value, message),
            (None, false) => write!(f, ":{}", value),
            (None, true) => Ok(()),
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Outcome of one condition during an evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConditionOutcome {
    pub field: String,
    pub capability: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-field results, one boolean per capability run, in run order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub field: String,
    pub evaluated: Vec<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// The result of evaluating a [`ValidatorSet`](crate::evaluate::ValidatorSet)
/// against one record.
///
/// Fields appear in the order they were first evaluated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub passed: bool,
    /// The condition gate was closed, so no validation ran.
    pub exempt: bool,
    pub strict: StrictMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_status: Option<PassStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<PassStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionOutcome>,
    pub fields: Vec<FieldOutcome>,
}

impl Report {
    pub(crate) fn new(strict: StrictMode) -> Self {
        Report {
            passed: false,
            exempt: false,
            strict,
            condition_status: None,
            validation_status: None,
            conditions: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, field: &str, passed: bool, message: impl FnOnce() -> String) {
        let idx = match self.fields.iter().position(|f| f.field == field) {
            Some(idx) => idx,
            None => {
                self.fields.push(FieldOutcome {
                    field: field.to_string(),
                    evaluated: Vec::new(),
                    errors: Vec::new(),
                });
                self.fields.len() - 1
            }
        };
        let outcome = &mut self.fields[idx];
        outcome.evaluated.push(passed);
        if !passed {
            outcome.errors.push(message());
        }
    }

    fn field(&self, field: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.field == field)
    }

    /// Error messages recorded for `field`, empty if none.
    pub fn errors(&self, field: &str) -> &[String] {
        self.field(field).map(|f| f.errors.as_slice()).unwrap_or(&[])
    }

    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| !f.errors.is_empty())
    }

    pub fn has_field_errors(&self, field: &str) -> bool {
        !self.errors(field).is_empty()
    }

    /// Number of fields with at least one error.
    pub fn error_field_count(&self) -> usize {
        self.fields.iter().filter(|f| !f.errors.is_empty()).count()
    }

    /// Results recorded for `field`, `None` if it was never evaluated.
    pub fn evaluated(&self, field: &str) -> Option<&[bool]> {
        self.field(field).map(|f| f.evaluated.as_slice())
    }

    pub fn is_evaluated(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn is_field_evaluated(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// Field → messages, in evaluation order, for fields that failed.
    pub fn error_map(&self) -> serde_json::Map<String, Value> {
        self.fields
            .iter()
            .filter(|f| !f.errors.is_empty())
            .map(|f| {
                let messages = f.errors.iter().cloned().map(Value::String).collect();
                (f.field.clone(), Value::Array(messages))
            })
            .collect()
    }
}

// ─── Rule-set document ──────────────────────────────────────────────────────

/// A declarative rule set, as loaded from YAML or JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    #[serde(default)]
    pub strict: StrictMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<RuleEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<RuleEntry>,
}

/// One rule in a document: DSL shorthand or the structured form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Rule(String),
    Binding(RuleBinding),
}

/// Structured rule form. `capability` may be snake_case or TitleCase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleBinding {
    pub field: String,
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
