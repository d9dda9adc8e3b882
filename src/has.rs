//! The "has" family: capabilities that look up a named field of the record
//! themselves, so they are always handed the whole record.
//!
//! The item tests (`HasOneThat*`, `HasOne{Greater,Less}*`, `HasOneNotEmpty`)
//! flatten matched lists into items (see [`field_items`]), so
//! `{"ids": [1, 2]}` and `{"users": [{"id": 1}, {"id": 2}]}` both give two
//! items for `ids` and `users.id` respectively.
//!
//! The size tests (`HasOne`, `HasOnlyOne`, `HasCount*`) measure one list
//! instead. A simple field must hold a list or a map. A dotted field counts
//! its matches for `HasOne`/`HasOnlyOne`, and the first match's entries for
//! `HasCount*`. An absent field fails the test.

use serde_json::Value;

use crate::capabilities::{BuiltinKind, count_of, number_operand, ordering_holds, type_name};
use crate::error::ConfigError;
use crate::primitives::*;
use crate::types::Operand;

pub(crate) fn check_keyed(kind: BuiltinKind, operand: &Operand) -> Result<(), ConfigError> {
    let Operand::Keyed { field, .. } = operand else {
        return Err(ConfigError::operand(
            kind.name(),
            "expected a {field: value} operand",
        ));
    };
    if field.is_empty() {
        return Err(ConfigError::operand(kind.name(), "the field name is empty"));
    }
    if needs_number(kind) {
        number_operand(kind.name(), operand)?;
    }
    Ok(())
}

pub(crate) fn check_named(kind: BuiltinKind, operand: &Operand) -> Result<(), ConfigError> {
    match operand {
        Operand::Field(field) if !field.is_empty() => Ok(()),
        Operand::Field(_) => Err(ConfigError::operand(kind.name(), "the field name is empty")),
        _ => Err(ConfigError::operand(kind.name(), "expected a field name operand")),
    }
}

fn needs_number(kind: BuiltinKind) -> bool {
    use BuiltinKind as K;
    !matches!(
        kind,
        K::HasOneThatEquals
            | K::HasOnlyOneThatEquals
            | K::HasOneThatContains
            | K::HasOnlyOneThatContains
    )
}

pub(crate) fn evaluate(
    kind: BuiltinKind,
    operand: &Operand,
    record: &Value,
) -> Result<bool, ConfigError> {
    use BuiltinKind as K;

    if !matches!(record, Value::Object(_) | Value::Array(_)) {
        return Err(ConfigError::input(
            kind.name(),
            format!("the evaluated input must be a map or a list, got {}", type_name(record)),
        ));
    }

    if let Operand::Field(field) = operand {
        return Ok(match kind {
            K::HasOne => field_size(kind, record, field)?.is_some_and(|size| size > 0),
            K::HasOnlyOne => field_size(kind, record, field)? == Some(1),
            K::HasOneNotEmpty => field_items(record, field).iter().any(|item| !is_blank(item)),
            _ => is_required_present(record, field),
        });
    }

    let Operand::Keyed { field, value } = operand else {
        return Err(ConfigError::operand(kind.name(), "expected a {field: value} operand"));
    };
    let items = field_items(record, field);

    let result = match kind {
        K::HasOneThatEquals => count_matching(&items, |item| loose_eq(item, value)) >= 1,
        K::HasOnlyOneThatEquals => count_matching(&items, |item| loose_eq(item, value)) == 1,
        K::HasOneThatContains => count_matching(&items, |item| contains_value(item, value)) >= 1,
        K::HasOnlyOneThatContains => count_matching(&items, |item| contains_value(item, value)) == 1,
        K::HasOneGreaterThan
        | K::HasOneGreaterThanEqual
        | K::HasOneLessThan
        | K::HasOneLessThanEqual => items.iter().any(|item| ordering_holds(kind, item, value)),
        _ => {
            let expected = number_operand(kind.name(), operand)?;
            let Some(count) = field_size(kind, record, field)? else {
                return Ok(false);
            };
            let count = count as f64;
            match kind {
                K::HasCountEqual => count == expected,
                K::HasCountNotEqual => count != expected,
                K::HasCountGreaterThan => count > expected,
                K::HasCountGreaterThanEqual => count >= expected,
                K::HasCountLessThan => count < expected,
                _ => count <= expected,
            }
        }
    };
    Ok(result)
}

/// Size of the list `field` addresses, `None` when it is absent or null.
fn field_size(kind: BuiltinKind, record: &Value, field: &str) -> Result<Option<usize>, ConfigError> {
    if !is_dotted(field) {
        return match record.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => count_of(kind.name(), value).map(Some),
        };
    }
    let matches = resolve_path(field, record);
    if matches!(kind, BuiltinKind::HasOne | BuiltinKind::HasOnlyOne) {
        let present = matches.iter().filter(|value| !value.is_null()).count();
        return Ok(Some(present));
    }
    match matches.first() {
        None | Some(Value::Null) => Ok(None),
        Some(first) => count_of(kind.name(), first).map(Some),
    }
}

fn count_matching(items: &[Value], predicate: impl Fn(&Value) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

/// A simple field is present as a key. A dotted field is present once under
/// every parent item, and there is at least one parent.
fn is_required_present(record: &Value, field: &str) -> bool {
    let Some((parent, _)) = field.rsplit_once('.') else {
        return record.get(field).is_some();
    };
    let parents = field_items(record, parent).len();
    let children = resolve_path(field, record).len();
    parents > 0 && parents == children
}

pub(crate) fn default_message(kind: BuiltinKind, operand: &Operand) -> String {
    use BuiltinKind as K;

    let field = operand.target_field().unwrap_or_default();
    let value = match operand {
        Operand::Keyed { value, .. } => value_text(value).unwrap_or_else(|| value.to_string()),
        _ => String::new(),
    };
    match kind {
        K::HasOne => format!("The input must contain at least one item of '{}'.", field),
        K::HasOnlyOne => format!("The input must contain only one item of '{}'.", field),
        K::HasOneNotEmpty => {
            format!("The input must contain one item of '{}' that is not empty.", field)
        }
        K::Required => format!("The field '{}' is required.", field),
        K::HasOneThatEquals => format!(
            "The input must contain one item of '{}' equal to '{}'.",
            field, value
        ),
        K::HasOnlyOneThatEquals => format!(
            "The input must contain only one item of '{}' equal to '{}'.",
            field, value
        ),
        K::HasOneThatContains => format!(
            "The input must contain one item of '{}' that contains '{}'.",
            field, value
        ),
        K::HasOnlyOneThatContains => format!(
            "The input must contain only one item of '{}' that contains '{}'.",
            field, value
        ),
        K::HasOneGreaterThan => format!(
            "The input must contain one item of '{}' that is greater than '{}'.",
            field, value
        ),
        K::HasOneGreaterThanEqual => format!(
            "The input must contain one item of '{}' that is greater than or equal to '{}'.",
            field, value
        ),
        K::HasOneLessThan => format!(
            "The input must contain one item of '{}' that is less than '{}'.",
            field, value
        ),
        K::HasOneLessThanEqual => format!(
            "The input must contain one item of '{}' that is less than or equal to '{}'.",
            field, value
        ),
        K::HasCountEqual => format!("The field '{}' must have {} item(s).", field, value),
        K::HasCountNotEqual => format!("The field '{}' must not have {} item(s).", field, value),
        K::HasCountGreaterThan => {
            format!("The field '{}' must have more than {} item(s).", field, value)
        }
        K::HasCountGreaterThanEqual => {
            format!("The field '{}' must have at least {} item(s).", field, value)
        }
        K::HasCountLessThan => {
            format!("The field '{}' must have fewer than {} item(s).", field, value)
        }
        K::HasCountLessThanEqual => {
            format!("The field '{}' must have at most {} item(s).", field, value)
        }
        _ => "The value is not valid.".to_string(),
    }
}
