//! [`RuleSetDocument`] → YAML serialization.

use serde_json::Value;

use crate::error::SerializeError;
use crate::evaluate::ValidatorSet;
use crate::registry::title_case_to_snake_case;
use crate::types::{Operand, Rule, RuleBinding, RuleEntry, RuleSetDocument};

/// Serialize a rule-set document to a YAML string.
///
/// `strict` is emitted first, then `conditions` and `validators`; empty
/// sections are omitted.
pub fn serialize(doc: &RuleSetDocument) -> Result<String, SerializeError> {
    let value = serde_json::to_value(doc).map_err(|e| SerializeError {
        message: format!("failed to convert document to JSON value: {}", e),
    })?;

    serde_saphyr::to_string(&value).map_err(|e| SerializeError {
        message: format!("failed to serialize to YAML: {}", e),
    })
}

/// The document form of a validator set's declared conditions and validators.
///
/// Instances loaded directly, without a declaration, have no document form
/// and are left out.
pub fn to_document(set: &ValidatorSet) -> RuleSetDocument {
    let conditions = set
        .conditions()
        .iter()
        .map(|condition| to_entry(condition.to_rule()))
        .collect();
    let validators = set
        .fields()
        .flat_map(|field| {
            set.validators(field).iter().map(move |binding| {
                to_entry(Rule {
                    field: field.to_string(),
                    capability: binding.capability().to_string(),
                    value: binding.value().clone(),
                    message: binding.message().map(str::to_string),
                })
            })
        })
        .collect();

    RuleSetDocument {
        strict: set.strict(),
        conditions,
        validators,
    }
}

/// DSL shorthand when it reads back to the same rule, the structured form otherwise.
pub fn to_entry(rule: Rule) -> RuleEntry {
    if fits_shorthand(&rule) {
        return RuleEntry::Rule(rule.to_string());
    }
    let value = match &rule.value {
        Operand::None | Operand::Field(_) => None,
        Operand::Keyed { field, value } if *field == rule.field => match value {
            Value::Null => None,
            other => Some(other.clone()),
        },
        other => Some(other.to_value()),
    };
    RuleEntry::Binding(RuleBinding {
        field: rule.field,
        capability: title_case_to_snake_case(&rule.capability),
        value,
        message: rule.message,
    })
}

fn fits_shorthand(rule: &Rule) -> bool {
    let plain = |value: &Value| match value {
        Value::String(text) => !text.is_empty() && !text.contains([',', ':']) && text.trim() == text,
        Value::Number(_) | Value::Bool(_) => true,
        _ => false,
    };
    let value_fits = match &rule.value {
        Operand::None | Operand::Field(_) => true,
        Operand::Scalar(value) => plain(value),
        Operand::List(items) => items.len() > 1 && items.iter().all(plain),
        Operand::Keyed { field, value } => {
            *field == rule.field
                && match value {
                    Value::Null => true,
                    Value::Array(items) => items.len() > 1 && items.iter().all(plain),
                    other => plain(other),
                }
        }
    };
    // A comma anywhere turns the value segment into a list on the way back.
    let single_value = match &rule.value {
        Operand::Scalar(_) => true,
        Operand::Keyed { value, .. } => !value.is_null() && !value.is_array(),
        _ => false,
    };
    let stray_comma = rule.field.contains(',')
        || rule.message.as_deref().is_some_and(|message| message.contains(','));
    let message_fits = rule
        .message
        .as_deref()
        .is_none_or(|message| !message.is_empty() && message.trim() == message);

    value_fits
        && !rule.field.contains(':')
        && rule.field.trim() == rule.field
        && message_fits
        && !(single_value && stray_comma)
}
