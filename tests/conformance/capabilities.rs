use rulegate::registry::available_capabilities;
use rulegate::{
    Capability, CapabilityRegistry, ConfigError, Operand, OperandShape, StrictMode, ValidatorSet,
};
use serde_json::{Value, json};

use super::common::{error_kind, load_suite, report_suite};

#[derive(Debug, serde::Deserialize)]
struct CapabilityCase {
    id: String,
    #[serde(default)]
    name: Option<String>,
    rule: String,
    record: Value,
    #[serde(default)]
    expected: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

#[test]
fn builtin_capability_suite() {
    let cases: Vec<CapabilityCase> = load_suite("capabilities/builtin.yaml");

    let mut passed = 0;
    let mut failed = 0;

    for case in &cases {
        let result = ValidatorSet::from_rules([case.rule.as_str()], StrictMode::Both)
            .and_then(|set| set.evaluate(&case.record));

        let ok = match (&result, case.expected, &case.error) {
            (Ok(report), Some(expected), None) => report.passed == expected,
            (Err(e), None, Some(kind)) => kind.as_str() == error_kind(e),
            _ => false,
        };

        if ok {
            passed += 1;
        } else {
            eprintln!(
                "  FAIL [{}] {} '{}': expected {:?}/{:?}, got {:?}",
                case.id,
                case.name.as_deref().unwrap_or(""),
                case.rule,
                case.expected,
                case.error,
                result.map(|report| report.passed)
            );
            failed += 1;
        }
    }

    report_suite("builtin capabilities", passed, failed, cases.len());
}

#[test]
fn every_builtin_is_registered_under_both_spellings() {
    let registry = CapabilityRegistry::builtin();
    let names = available_capabilities();
    assert_eq!(registry.len(), names.len());
    for (title, snake) in names {
        assert_eq!(registry.resolve(title).unwrap().name, title);
        assert_eq!(registry.resolve(&snake).unwrap().name, title);
    }
}

#[test]
fn default_messages_mention_the_operand() {
    let set = ValidatorSet::from_rules(
        ["age:greater_than:17", "tags:has_count_equal:2", "email:required"],
        StrictMode::Both,
    )
    .unwrap();
    let report = set.evaluate(&json!({"age": 3, "tags": ["a"]})).unwrap();
    assert_eq!(report.errors("age"), ["The value must be greater than '17'."]);
    assert_eq!(report.errors("tags"), ["The field 'tags' must have 2 item(s)."]);
    assert_eq!(report.errors("email"), ["The field 'email' is required."]);
}

#[test]
fn custom_message_replaces_default() {
    let set = ValidatorSet::from_rules(["age:greater_than:17:Adults only."], StrictMode::Both).unwrap();
    let report = set.evaluate(&json!({"age": 3})).unwrap();
    assert_eq!(report.errors("age"), ["Adults only."]);
}

#[test]
fn set_operand_rechecks_the_operand() {
    let registry = CapabilityRegistry::builtin();
    let entry = registry.resolve("reg_ex").unwrap();
    let mut capability = entry.construct(Operand::from("^a"), None).unwrap();
    assert!(capability.evaluate(&json!("abc")).unwrap());

    let err = capability.set_operand(Operand::from("(")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOperand { .. }));
    assert_eq!(capability.operand(), &Operand::from("^a"));
}

#[test]
fn keyed_capability_reads_an_explicit_field() {
    let registry = CapabilityRegistry::builtin();
    let capability = registry
        .resolve("has_one_that_equals")
        .unwrap()
        .bind("order", Operand::Scalar(json!({"items.sku": "b"})), None)
        .unwrap();
    let record = json!({"items": [{"sku": "a"}, {"sku": "b"}]});
    assert!(capability.evaluate(&record).unwrap());
    assert!(matches!(
        capability.evaluate(&json!("scalar")),
        Err(ConfigError::InvalidInput { .. })
    ));
}

#[test]
fn shapes_are_a_property_of_the_name() {
    let registry = CapabilityRegistry::builtin();
    assert_eq!(registry.shape_of("equal"), Some(OperandShape::Scalar));
    assert_eq!(
        registry.shape_of("has_count_equal"),
        Some(OperandShape::FieldKeyed)
    );
    assert_eq!(registry.shape_of("required"), Some(OperandShape::FieldName));
    assert_eq!(registry.shape_of("nope"), None);
}

// ─── Custom capabilities ─────────────────────────────────────────────────────

#[derive(Debug)]
struct Even {
    operand: Operand,
    message: Option<String>,
}

impl Capability for Even {
    fn name(&self) -> &str {
        "Even"
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn set_operand(&mut self, operand: Operand) -> Result<(), ConfigError> {
        self.operand = operand;
        Ok(())
    }

    fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "The value must be even.".to_string())
    }

    fn evaluate(&self, input: &Value) -> Result<bool, ConfigError> {
        Ok(input.as_i64().is_some_and(|n| n % 2 == 0))
    }
}

fn registry_with_even() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::builtin();
    registry.register("even", OperandShape::Scalar, |operand, message| {
        Ok(Box::new(Even { operand, message }) as Box<dyn Capability>)
    });
    registry
}

#[test]
fn custom_capability_is_resolvable_from_rules() {
    let registry = std::sync::Arc::new(registry_with_even());
    assert!(registry.contains("Even"));

    let mut set = ValidatorSet::with_registry(registry);
    set.add_validator_from_rule("n:even").unwrap();
    assert!(set.evaluate(&json!({"n": 4})).unwrap().passed);

    let report = set.evaluate(&json!({"n": 5})).unwrap();
    assert!(!report.passed);
    assert_eq!(report.errors("n"), ["The value must be even."]);
}

#[test]
fn registering_twice_replaces_the_entry() {
    let mut registry = registry_with_even();
    let before = registry.len();
    registry.register("Even", OperandShape::FieldName, |operand, message| {
        Ok(Box::new(Even { operand, message }) as Box<dyn Capability>)
    });
    assert_eq!(registry.len(), before);
    assert_eq!(registry.shape_of("even"), Some(OperandShape::FieldName));
}

#[test]
fn empty_registry_knows_nothing() {
    let registry = CapabilityRegistry::empty();
    assert!(registry.is_empty());
    assert_eq!(
        registry.resolve("equal").unwrap_err(),
        ConfigError::UnknownCapability {
            name: "equal".to_string()
        }
    );
}
