use serde_json::Value;

use crate::error::{ConfigError, ParseError, ParseErrorKind};
use crate::registry::{CapabilityRegistry, snake_case_to_title_case};
use crate::types::{Operand, Rule, RuleBinding, RuleEntry, RuleSetDocument};

// ─── Rule DSL ───────────────────────────────────────────────────────────────

/// Parse a `field:capability[:value[,value]*][:message]` rule string.
///
/// The capability is written in snake_case and resolved against `registry`;
/// the stored name is the canonical registered one. A comma anywhere in the
/// rule makes the value segment a list, even when the comma sits in the
/// message. Everything after the third colon is the message, so messages may
/// contain colons. The operand is then shaped for the capability (see
/// [`Operand::shaped`]).
pub fn parse_rule(rule: &str, registry: &CapabilityRegistry) -> Result<Rule, ConfigError> {
    let segments: Vec<&str> = rule.splitn(4, ':').map(str::trim).collect();
    let (field, token) = match segments.as_slice() {
        [field, token, ..] if !field.is_empty() && !token.is_empty() => (*field, *token),
        _ => {
            return Err(ConfigError::MalformedRule {
                rule: rule.to_string(),
            });
        }
    };

    let entry = registry.resolve(&snake_case_to_title_case(token))?;
    let as_list = rule.contains(',');
    let value = segments
        .get(2)
        .map_or(Operand::None, |segment| parse_value_segment(segment, as_list));
    let message = segments
        .get(3)
        .filter(|message| !message.is_empty())
        .map(|message| message.to_string());

    Ok(Rule {
        field: field.to_string(),
        capability: entry.name.clone(),
        value: value.shaped(entry.shape, field),
        message,
    })
}

/// Parse several rule strings, stopping at the first error.
pub fn parse_rules<I, S>(rules: I, registry: &CapabilityRegistry) -> Result<Vec<Rule>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    rules
        .into_iter()
        .map(|rule| parse_rule(rule.as_ref(), registry))
        .collect()
}

fn parse_value_segment(segment: &str, as_list: bool) -> Operand {
    if segment.is_empty() {
        return Operand::None;
    }
    if !as_list {
        return Operand::Scalar(Value::String(segment.to_string()));
    }
    let items: Vec<Value> = segment
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Value::String(item.to_string()))
        .collect();
    if items.is_empty() {
        Operand::None
    } else {
        Operand::List(items)
    }
}

/// Turn a structured binding into a [`Rule`]. The capability may be written
/// in snake_case or TitleCase.
pub fn parse_binding(binding: &RuleBinding, registry: &CapabilityRegistry) -> Result<Rule, ConfigError> {
    if binding.field.trim().is_empty() || binding.capability.trim().is_empty() {
        return Err(ConfigError::MalformedRule {
            rule: format!("{}:{}", binding.field, binding.capability),
        });
    }
    let field = binding.field.trim();
    let entry = registry.resolve(&snake_case_to_title_case(binding.capability.trim()))?;
    let value = binding.value.clone().map_or(Operand::None, Operand::from);
    Ok(Rule {
        field: field.to_string(),
        capability: entry.name.clone(),
        value: value.shaped(entry.shape, field),
        message: binding.message.clone(),
    })
}

/// A document entry in either form.
pub fn parse_entry(entry: &RuleEntry, registry: &CapabilityRegistry) -> Result<Rule, ConfigError> {
    match entry {
        RuleEntry::Rule(rule) => parse_rule(rule, registry),
        RuleEntry::Binding(binding) => parse_binding(binding, registry),
    }
}

// ─── Rule-set documents ─────────────────────────────────────────────────────

const TOP_LEVEL_KEYS: &[&str] = &["strict", "conditions", "validators"];

/// Parse a YAML (or JSON) string into an unvalidated rule-set document.
///
/// Performs deserialization and type mapping only; capability names are not
/// resolved here (see [`validate`](crate::validate::validate)).
pub fn parse_document(input: &str) -> Result<RuleSetDocument, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            kind: ParseErrorKind::Syntax,
            message: "empty input".to_string(),
            path: None,
            line: None,
            column: None,
        });
    }

    check_multi_document(input)?;

    let value: Value = serde_saphyr::from_str(input).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_saphyr_error(&msg),
            message: msg,
            path: None,
            line: None,
            column: None,
        }
    })?;

    let Some(obj) = value.as_object() else {
        return Err(ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: "document root must be a YAML mapping".to_string(),
            path: None,
            line: None,
            column: None,
        });
    };

    if let Some(other) = obj.keys().find(|key| !TOP_LEVEL_KEYS.contains(&key.as_str())) {
        return Err(ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: format!("unknown top-level field: {}", other),
            path: Some(other.to_string()),
            line: None,
            column: None,
        });
    }

    for section in ["conditions", "validators"] {
        if let Some(entries) = obj.get(section) {
            check_entries(section, entries)?;
        }
    }

    serde_json::from_value(value).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_json_error(&msg),
            message: msg,
            path: None,
            line: None,
            column: None,
        }
    })
}

/// Untagged entries lose serde's field-level messages, so check their shape
/// here to report a useful path.
fn check_entries(section: &str, entries: &Value) -> Result<(), ParseError> {
    let mismatch = |path: String, message: String| ParseError {
        kind: ParseErrorKind::TypeMismatch,
        message,
        path: Some(path),
        line: None,
        column: None,
    };

    let Some(items) = entries.as_array() else {
        return Err(mismatch(
            section.to_string(),
            format!("'{}' must be a list of rules", section),
        ));
    };
    for (i, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", section, i);
        match item {
            Value::String(_) => {}
            Value::Object(map) => {
                for key in ["field", "capability"] {
                    if !map.get(key).is_some_and(Value::is_string) {
                        return Err(mismatch(
                            format!("{}.{}", path, key),
                            format!("missing field `{}` at {}", key, path),
                        ));
                    }
                }
                if let Some(key) = map
                    .keys()
                    .find(|key| !["field", "capability", "value", "message"].contains(&key.as_str()))
                {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnknownVariant,
                        message: format!("unknown field `{}` at {}", key, path),
                        path: Some(format!("{}.{}", path, key)),
                        line: None,
                        column: None,
                    });
                }
                if map.get("message").is_some_and(|m| !m.is_string() && !m.is_null()) {
                    return Err(mismatch(
                        format!("{}.message", path),
                        format!("message at {} must be a string", path),
                    ));
                }
            }
            _ => {
                return Err(mismatch(
                    path.clone(),
                    format!("rule at {} must be a string or a mapping", path),
                ));
            }
        }
    }
    Ok(())
}

/// Check for multiple YAML documents (--- separator).
/// Only matches `---` at column 0 to avoid false positives inside block scalars.
fn check_multi_document(input: &str) -> Result<(), ParseError> {
    let mut doc_count = 0;
    for line in input.lines() {
        if line.starts_with("---") && line[3..].trim().is_empty() {
            doc_count += 1;
            if doc_count > 1 {
                return Err(ParseError {
                    kind: ParseErrorKind::Syntax,
                    message: "multi-document YAML is not supported".to_string(),
                    path: None,
                    line: None,
                    column: None,
                });
            }
        }
    }
    Ok(())
}

fn classify_saphyr_error(msg: &str) -> ParseErrorKind {
    let lower = msg.to_lowercase();
    if lower.contains("unknown") || lower.contains("variant") {
        ParseErrorKind::UnknownVariant
    } else if lower.contains("type") || lower.contains("invalid") || lower.contains("expected") {
        ParseErrorKind::TypeMismatch
    } else {
        ParseErrorKind::Syntax
    }
}

fn classify_json_error(msg: &str) -> ParseErrorKind {
    let lower = msg.to_lowercase();
    if lower.contains("unknown variant") || lower.contains("unknown field") {
        ParseErrorKind::UnknownVariant
    } else if lower.contains("missing field") || lower.contains("invalid type") {
        ParseErrorKind::TypeMismatch
    } else {
        ParseErrorKind::Syntax
    }
}
