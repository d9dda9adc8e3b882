use rulegate::{CapabilityRegistry, Condition, ConfigError, Operand, OperandShape};
use serde_json::json;

fn registry() -> CapabilityRegistry {
    CapabilityRegistry::builtin()
}

#[test]
fn condition_from_rule_on_simple_field() {
    let condition = Condition::from_rule("country:equal:US", &registry()).unwrap();
    assert_eq!(condition.field(), "country");
    assert_eq!(condition.capability(), "Equal");
    assert_eq!(condition.shape(), OperandShape::Scalar);
    assert!(condition.evaluate(&json!({"country": "US"})).unwrap());
    assert!(!condition.evaluate(&json!({"country": "UK"})).unwrap());
}

#[test]
fn missing_simple_field_is_an_error_by_default() {
    let condition = Condition::from_rule("country:equal:US", &registry()).unwrap();
    assert!(condition.requires_field());
    assert_eq!(
        condition.evaluate(&json!({"city": "Paris"})).unwrap_err(),
        ConfigError::MissingField {
            field: "country".to_string()
        }
    );
}

#[test]
fn missing_simple_field_fails_when_not_required() {
    let condition = Condition::from_rule("country:equal:US", &registry())
        .unwrap()
        .with_require_field(false);
    assert!(!condition.evaluate(&json!({"city": "Paris"})).unwrap());
}

#[test]
fn dotted_field_without_matches_fails() {
    let condition = Condition::from_rule("account.plan:equal:pro", &registry()).unwrap();
    assert!(!condition.evaluate(&json!({"account": {}})).unwrap());
    assert!(condition.evaluate(&json!({"account": {"plan": "pro"}})).unwrap());
}

#[test]
fn dotted_field_with_several_matches_sees_the_list() {
    let condition = Condition::from_rule("users.role:contains:admin", &registry()).unwrap();
    let record = json!({"users": [{"role": "dev"}, {"role": "admin"}]});
    assert!(condition.evaluate(&record).unwrap());
}

#[test]
fn bracket_reference_resolves_per_record() {
    let condition = Condition::from_rule("end:greater_than:[start]", &registry()).unwrap();
    assert!(condition.evaluate(&json!({"start": 1, "end": 2})).unwrap());
    assert!(!condition.evaluate(&json!({"start": 3, "end": 2})).unwrap());
    assert_eq!(condition.value(), &Operand::from("[start]"));
}

#[test]
fn bare_reference_names_a_top_level_key() {
    let condition = Condition::from_rule("confirm:equal:password", &registry()).unwrap();
    let record = json!({"password": "s3cret", "confirm": "s3cret"});
    assert_eq!(condition.resolved_value(&record), Operand::from("s3cret"));
    assert!(condition.evaluate(&record).unwrap());

    // Without such a key the text is compared literally.
    assert!(condition.evaluate(&json!({"confirm": "password"})).unwrap());
}

#[test]
fn numeric_text_is_never_a_reference() {
    let condition = Condition::from_rule("n:equal:1", &registry()).unwrap();
    let record = json!({"1": "x", "n": 1});
    assert_eq!(condition.resolved_value(&record), Operand::from("1"));
    assert!(condition.evaluate(&record).unwrap());
}

#[test]
fn missing_bracket_reference_keeps_the_literal() {
    let condition = Condition::from_rule("code:equal:[expected]", &registry()).unwrap();
    let record = json!({"code": "[expected]"});
    assert_eq!(condition.resolved_value(&record), Operand::from("[expected]"));
    assert!(condition.evaluate(&record).unwrap());
}

#[test]
fn dotted_bracket_reference_collects_matches() {
    let condition = Condition::from_rule("role:in:[roles.name]", &registry()).unwrap();
    let record = json!({"role": "b", "roles": [{"name": "a"}, {"name": "b"}]});
    assert_eq!(
        condition.resolved_value(&record),
        Operand::Scalar(json!(["a", "b"]))
    );
    assert!(condition.evaluate(&record).unwrap());
}

#[test]
fn bind_shapes_the_resolved_operand() {
    let condition =
        Condition::new("tags", "has_count_equal", Operand::from("[expected]"), &registry()).unwrap();
    let record = json!({"expected": 2, "tags": ["a", "b"]});
    let capability = condition.bind(&record).unwrap();
    assert_eq!(
        capability.operand(),
        &Operand::Keyed {
            field: "tags".to_string(),
            value: json!(2)
        }
    );
    assert!(condition.evaluate(&record).unwrap());
}

#[test]
fn field_addressed_condition_sees_the_whole_record() {
    let condition = Condition::from_rule("items.sku:has_one_that_equals:x", &registry()).unwrap();
    assert!(condition.evaluate(&json!({"items": [{"sku": "y"}, {"sku": "x"}]})).unwrap());
    assert!(!condition.evaluate(&json!({"items": []})).unwrap());
}

#[test]
fn condition_message_and_display() {
    let condition = Condition::new("age", "greater_than", 17, &registry())
        .unwrap()
        .with_message("Adults only.");
    assert_eq!(condition.message(), Some("Adults only."));
    assert_eq!(condition.to_string(), "age:greater_than:17:Adults only.");
    assert_eq!(condition.to_rule().capability, "GreaterThan");
}

#[test]
fn unknown_capability_is_rejected_at_construction() {
    assert!(matches!(
        Condition::new("a", "nope", 1, &registry()),
        Err(ConfigError::UnknownCapability { .. })
    ));
    assert!(matches!(
        Condition::from_rule("a", &registry()),
        Err(ConfigError::MalformedRule { .. })
    ));
}
