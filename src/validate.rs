//! Rule-set document validation.
//!
//! Returns **all** errors and warnings, not just the first. Validation does
//! not modify the document and builds nothing it keeps.
//!
//! | Code  | Check |
//! |-------|-------|
//! | V-001 | every rule has a field and a capability |
//! | V-002 | every capability is registered |
//! | V-003 | every operand suits its capability |
//! | W-001 | the document declares at least one rule |
//! | W-002 | no rule is declared twice in a section |
//! | W-003 | operand looks like a field reference, checked at evaluation |

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::*;
use crate::parse::parse_entry;
use crate::registry::CapabilityRegistry;
use crate::types::*;

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_.]*)$").unwrap());

/// Validate a parsed document against `registry`.
pub fn validate(doc: &RuleSetDocument, registry: &CapabilityRegistry) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    w001_document_not_empty(doc, &mut warnings);
    for (section, entries) in [("conditions", &doc.conditions), ("validators", &doc.validators)] {
        let rules = v001_v002_rules_resolve(section, entries, registry, &mut errors);
        v003_operands_valid(registry, &rules, &mut errors, &mut warnings);
        w002_no_duplicate_rules(&rules, &mut warnings);
    }

    ValidationResult { errors, warnings }
}

/// A successfully resolved entry and where it sits in the document.
struct Located {
    path: String,
    rule: Rule,
}

fn w001_document_not_empty(doc: &RuleSetDocument, warnings: &mut Vec<Diagnostic>) {
    if doc.conditions.is_empty() && doc.validators.is_empty() {
        warnings.push(Diagnostic {
            severity: DiagnosticSeverity::Warning,
            code: "W-001".to_string(),
            path: None,
            message: "document declares no conditions and no validators".to_string(),
        });
    }
}

fn v001_v002_rules_resolve(
    section: &str,
    entries: &[RuleEntry],
    registry: &CapabilityRegistry,
    errors: &mut Vec<ValidationError>,
) -> Vec<Located> {
    let mut rules = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let path = format!("{}[{}]", section, i);
        match parse_entry(entry, registry) {
            Ok(rule) => rules.push(Located { path, rule }),
            Err(e) => {
                let code = match e {
                    ConfigError::UnknownCapability { .. } => "V-002",
                    _ => "V-001",
                };
                errors.push(ValidationError {
                    rule: code.to_string(),
                    path,
                    message: e.to_string(),
                });
            }
        }
    }
    rules
}

fn v003_operands_valid(
    registry: &CapabilityRegistry,
    rules: &[Located],
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    for located in rules {
        let Some(entry) = registry.get(&located.rule.capability) else {
            continue;
        };
        let Err(e) = entry.construct(located.rule.value.clone(), None) else {
            continue;
        };
        if may_hold_reference(&located.rule.value) {
            warnings.push(Diagnostic {
                severity: DiagnosticSeverity::Warning,
                code: "W-003".to_string(),
                path: Some(located.path.clone()),
                message: format!(
                    "'{}' is only valid once its field references resolve: {}",
                    located.rule, e
                ),
            });
        } else {
            errors.push(ValidationError {
                rule: "V-003".to_string(),
                path: located.path.clone(),
                message: e.to_string(),
            });
        }
    }
}

fn may_hold_reference(operand: &Operand) -> bool {
    let looks_like_reference =
        |value: &Value| value.as_str().is_some_and(|text| REFERENCE_RE.is_match(text));
    match operand {
        Operand::Scalar(value) | Operand::Keyed { value, .. } => match value {
            Value::Array(items) => items.iter().any(looks_like_reference),
            other => looks_like_reference(other),
        },
        Operand::List(items) => items.iter().any(looks_like_reference),
        Operand::None | Operand::Field(_) => false,
    }
}

fn w002_no_duplicate_rules(rules: &[Located], warnings: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for located in rules {
        let rendered = located.rule.to_string();
        if !seen.insert(rendered.clone()) {
            warnings.push(Diagnostic {
                severity: DiagnosticSeverity::Warning,
                code: "W-002".to_string(),
                path: Some(located.path.clone()),
                message: format!("duplicate rule '{}'", rendered),
            });
        }
    }
}
