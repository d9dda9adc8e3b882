use rulegate::{CapabilityRegistry, Operand, parse_rule};
use serde_json::Value;

use super::common::{error_kind, load_suite, report_suite};

#[derive(Debug, serde::Deserialize)]
struct RuleCase {
    id: String,
    rule: String,
    #[serde(default)]
    expected: Option<ExpectedRule>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ExpectedRule {
    field: String,
    capability: String,
    kind: String,
    value: Value,
    #[serde(default)]
    message: Option<String>,
}

fn operand_kind(operand: &Operand) -> &'static str {
    match operand {
        Operand::None => "none",
        Operand::Scalar(_) => "scalar",
        Operand::List(_) => "list",
        Operand::Keyed { .. } => "keyed",
        Operand::Field(_) => "field",
    }
}

#[test]
fn parse_rule_suite() {
    let cases: Vec<RuleCase> = load_suite("rules/parse-rule.yaml");
    let registry = CapabilityRegistry::builtin();

    let mut passed = 0;
    let mut failed = 0;

    for case in &cases {
        let result = parse_rule(&case.rule, &registry);

        let outcome = match (&case.expected, &case.error, &result) {
            (Some(expected), None, Ok(rule)) => {
                let mismatches: Vec<String> = [
                    (rule.field != expected.field).then(|| format!("field {}", rule.field)),
                    (rule.capability != expected.capability)
                        .then(|| format!("capability {}", rule.capability)),
                    (operand_kind(&rule.value) != expected.kind)
                        .then(|| format!("kind {}", operand_kind(&rule.value))),
                    (rule.value.to_value() != expected.value)
                        .then(|| format!("value {}", rule.value.to_value())),
                    (rule.message != expected.message).then(|| format!("message {:?}", rule.message)),
                ]
                .into_iter()
                .flatten()
                .collect();
                if mismatches.is_empty() {
                    Ok(())
                } else {
                    Err(mismatches.join(", "))
                }
            }
            (None, Some(kind), Err(e)) if kind.as_str() == error_kind(e) => Ok(()),
            (_, _, Ok(rule)) => Err(format!("unexpected rule {:?}", rule)),
            (_, _, Err(e)) => Err(format!("unexpected error {}", e)),
        };

        match outcome {
            Ok(()) => passed += 1,
            Err(detail) => {
                eprintln!("  FAIL [{}] '{}': {}", case.id, case.rule, detail);
                failed += 1;
            }
        }
    }

    report_suite("parse_rule", passed, failed, cases.len());
}

#[test]
fn parse_rules_stops_at_first_error() {
    let registry = CapabilityRegistry::builtin();
    let err = rulegate::parse::parse_rules(["a:equal:1", "b:nope", "c"], &registry).unwrap_err();
    assert_eq!(
        err,
        rulegate::ConfigError::UnknownCapability {
            name: "Nope".to_string()
        }
    );
}

#[test]
fn rule_display_renders_dsl() {
    let registry = CapabilityRegistry::builtin();
    for text in [
        "user_id:equal:1",
        "ids:contains:1,2,3",
        "username:not_empty",
        "logins:greater_than:0:Must have logged in.",
        "email:required::The email is required.",
    ] {
        let rule = parse_rule(text, &registry).unwrap();
        assert_eq!(rule.to_string(), text);
    }
}

#[test]
fn structured_binding_accepts_title_case() {
    let registry = CapabilityRegistry::builtin();
    let binding = rulegate::RuleBinding {
        field: "age".to_string(),
        capability: "GreaterThan".to_string(),
        value: Some(serde_json::json!(18)),
        message: None,
    };
    let rule = rulegate::parse::parse_binding(&binding, &registry).unwrap();
    assert_eq!(rule.capability, "GreaterThan");
    assert_eq!(rule.value, Operand::Scalar(serde_json::json!(18)));
}

#[test]
fn structured_binding_with_explicit_target_field() {
    let registry = CapabilityRegistry::builtin();
    let binding = rulegate::RuleBinding {
        field: "order".to_string(),
        capability: "has_one_that_equals".to_string(),
        value: Some(serde_json::json!({"items.sku": "x"})),
        message: None,
    };
    let rule = rulegate::parse::parse_binding(&binding, &registry).unwrap();
    assert_eq!(
        rule.value,
        Operand::Keyed {
            field: "items.sku".to_string(),
            value: Value::from("x")
        }
    );
}
