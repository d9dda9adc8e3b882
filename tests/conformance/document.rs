use rulegate::serialize::{to_document, to_entry};
use rulegate::{
    CapabilityRegistry, Operand, ParseErrorKind, RuleEntry, RuleSetDocument, RulegateError,
    StrictMode, ValidatorSet, parse_document, serialize, validate,
};
use serde_json::json;
use std::sync::Arc;

// ─── parse_document ──────────────────────────────────────────────────────────

#[test]
fn parse_document_reads_both_rule_forms() {
    let doc = parse_document(
        r#"
strict: validations_only
conditions:
  - "country:equal:US"
validators:
  - "username:not_empty"
  - field: logins
    capability: greater_than
    value: 0
    message: Must have logged in.
"#,
    )
    .unwrap();

    assert_eq!(doc.strict, StrictMode::ValidationsOnly);
    assert_eq!(doc.conditions, [RuleEntry::Rule("country:equal:US".to_string())]);
    assert_eq!(doc.validators.len(), 2);
    let RuleEntry::Binding(binding) = &doc.validators[1] else {
        panic!("expected a structured rule, got {:?}", doc.validators[1]);
    };
    assert_eq!(binding.field, "logins");
    assert_eq!(binding.value, Some(json!(0)));
    assert_eq!(binding.message.as_deref(), Some("Must have logged in."));
}

#[test]
fn parse_document_accepts_numeric_strictness() {
    let doc = parse_document("strict: 2\nvalidators: []\n").unwrap();
    assert_eq!(doc.strict, StrictMode::ConditionsOnly);
    assert!(parse_document("strict: 7\n").is_err());
}

#[test]
fn parse_document_defaults_to_strict_both() {
    let doc = parse_document("validators:\n  - \"a:equal:1\"\n").unwrap();
    assert_eq!(doc.strict, StrictMode::Both);
    assert!(doc.conditions.is_empty());
}

#[test]
fn parse_document_errors() {
    let cases: &[(&str, &str, ParseErrorKind, Option<&str>)] = &[
        ("empty input", "   \n", ParseErrorKind::Syntax, None),
        (
            "several documents",
            "---\nstrict: none\n---\nstrict: both\n",
            ParseErrorKind::Syntax,
            None,
        ),
        ("list root", "- a\n- b\n", ParseErrorKind::TypeMismatch, None),
        (
            "unknown top-level key",
            "strict: none\nrules: []\n",
            ParseErrorKind::TypeMismatch,
            Some("rules"),
        ),
        (
            "section is not a list",
            "validators: nope\n",
            ParseErrorKind::TypeMismatch,
            Some("validators"),
        ),
        (
            "rule is neither string nor mapping",
            "validators:\n  - 42\n",
            ParseErrorKind::TypeMismatch,
            Some("validators[0]"),
        ),
        (
            "structured rule without capability",
            "conditions:\n  - field: a\n",
            ParseErrorKind::TypeMismatch,
            Some("conditions[0].capability"),
        ),
        (
            "structured rule with unknown key",
            "validators:\n  - field: a\n    capability: equal\n    extra: 1\n",
            ParseErrorKind::UnknownVariant,
            Some("validators[0].extra"),
        ),
        (
            "unknown strictness name",
            "strict: sometimes\n",
            ParseErrorKind::UnknownVariant,
            None,
        ),
    ];

    for (name, input, kind, path) in cases {
        let err = parse_document(input).unwrap_err();
        assert_eq!(&err.kind, kind, "{}: {}", name, err);
        assert_eq!(err.path.as_deref(), *path, "{}: {}", name, err);
    }
}

// ─── validate ────────────────────────────────────────────────────────────────

fn codes_at(result: &rulegate::ValidationResult) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let errors = result
        .errors
        .iter()
        .map(|e| (e.rule.clone(), e.path.clone()))
        .collect();
    let warnings = result
        .warnings
        .iter()
        .map(|w| (w.code.clone(), w.path.clone().unwrap_or_default()))
        .collect();
    (errors, warnings)
}

#[test]
fn validate_reports_every_problem() {
    let doc = parse_document(
        r#"
conditions:
  - "kind:equal:user"
validators:
  - "a:equal:1"
  - "a:equal:1"
  - "b"
  - "c:frobnicate"
  - "d:between:1"
  - "e:greater_than:min_age"
"#,
    )
    .unwrap();
    let result = validate(&doc, &CapabilityRegistry::builtin());
    assert!(!result.is_valid());

    let (errors, warnings) = codes_at(&result);
    let pair = |code: &str, path: &str| (code.to_string(), path.to_string());
    assert_eq!(
        errors,
        [
            pair("V-001", "validators[2]"),
            pair("V-002", "validators[3]"),
            pair("V-003", "validators[4]"),
        ]
    );
    assert!(warnings.contains(&pair("W-002", "validators[1]")));
    assert!(warnings.contains(&pair("W-003", "validators[5]")));
    assert!(!warnings.iter().any(|(code, _)| code == "W-001"));
}

#[test]
fn validate_warns_on_empty_document() {
    let result = validate(&RuleSetDocument::default(), &CapabilityRegistry::builtin());
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, "W-001");
}

#[test]
fn validate_checks_conditions_too() {
    let doc = parse_document("conditions:\n  - \"a:nope\"\n").unwrap();
    let result = validate(&doc, &CapabilityRegistry::builtin());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].rule, "V-002");
    assert_eq!(result.errors[0].path, "conditions[0]");
}

#[test]
fn bracket_reference_operand_is_only_a_warning() {
    let doc = parse_document("validators:\n  - \"max:greater_than:[min]\"\n").unwrap();
    let result = validate(&doc, &CapabilityRegistry::builtin());
    assert!(result.is_valid());
    assert_eq!(result.warnings[0].code, "W-003");
}

// ─── load / build ────────────────────────────────────────────────────────────

#[test]
fn load_builds_an_evaluable_set() {
    let set = rulegate::load(
        r#"
strict: none
conditions:
  - "country:equal:US"
validators:
  - "username:not_empty"
  - field: logins
    capability: greater_than
    value: 0
"#,
    )
    .unwrap();
    assert_eq!(set.strict(), StrictMode::None);
    assert_eq!(set.conditions().len(), 1);

    let report = set
        .evaluate(&json!({"country": "US", "username": "ann", "logins": 0}))
        .unwrap();
    assert!(report.passed);
    assert_eq!(report.error_field_count(), 1);
}

#[test]
fn load_returns_all_validation_errors() {
    let errors = rulegate::load("validators:\n  - \"a\"\n  - \"b:nope\"\n").unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, RulegateError::Validation(_))));
}

#[test]
fn load_returns_parse_error() {
    let errors = rulegate::load("").unwrap_err();
    assert!(matches!(errors.as_slice(), [RulegateError::Parse(_)]));
}

#[test]
fn load_with_registry_uses_custom_capabilities() {
    let mut registry = CapabilityRegistry::empty();
    registry.register("always", rulegate::OperandShape::Scalar, |operand, message| {
        let builtin = CapabilityRegistry::builtin();
        builtin.resolve("not_empty")?.construct(operand, message)
    });
    let registry = Arc::new(registry);

    let set = rulegate::load_with_registry("validators:\n  - \"a:always\"\n", registry.clone())
        .unwrap();
    assert!(set.evaluate(&json!({"a": "x"})).unwrap().passed);

    let errors =
        rulegate::load_with_registry("validators:\n  - \"a:equal:1\"\n", registry).unwrap_err();
    assert!(matches!(errors.as_slice(), [RulegateError::Validation(_)]));
}

#[test]
fn build_keeps_strictness_and_order() {
    let doc = parse_document(
        "strict: conditions_only\nvalidators:\n  - \"b:not_empty\"\n  - \"a:not_empty\"\n",
    )
    .unwrap();
    let set = rulegate::build(&doc, Arc::new(CapabilityRegistry::builtin())).unwrap();
    assert_eq!(set.strict(), StrictMode::ConditionsOnly);
    assert_eq!(set.fields().collect::<Vec<_>>(), ["b", "a"]);
}

// ─── serialize ───────────────────────────────────────────────────────────────

fn sample_set() -> ValidatorSet {
    let mut set = ValidatorSet::from_rules(
        ["a:equal:1", "ids:in:1,2,3", "b:not_empty::Required."],
        StrictMode::ValidationsOnly,
    )
    .unwrap();
    set.add_validator("note", "equal", "a:b").unwrap();
    set.add_validator(
        "order",
        "has_one_that_equals",
        Operand::Scalar(json!({"items.sku": "x"})),
    )
    .unwrap();
    set.add_condition_from_rule("kind:equal:user").unwrap();
    set
}

#[test]
fn to_document_prefers_shorthand() {
    let doc = to_document(&sample_set());
    assert_eq!(doc.strict, StrictMode::ValidationsOnly);
    assert_eq!(doc.conditions, [RuleEntry::Rule("kind:equal:user".to_string())]);
    assert_eq!(doc.validators[0], RuleEntry::Rule("a:equal:1".to_string()));
    assert_eq!(doc.validators[1], RuleEntry::Rule("ids:in:1,2,3".to_string()));
    assert_eq!(
        doc.validators[2],
        RuleEntry::Rule("b:not_empty::Required.".to_string())
    );
    assert!(matches!(&doc.validators[3], RuleEntry::Binding(b) if b.value == Some(json!("a:b"))));
    assert!(matches!(
        &doc.validators[4],
        RuleEntry::Binding(b) if b.capability == "has_one_that_equals"
            && b.value == Some(json!({"items.sku": "x"}))
    ));
}

#[test]
fn serialized_document_loads_back_to_the_same_rules() {
    let doc = to_document(&sample_set());
    let yaml = serialize(&doc).unwrap();
    let parsed = parse_document(&yaml).unwrap();
    assert_eq!(parsed, doc);

    let rebuilt = rulegate::build(&parsed, Arc::new(CapabilityRegistry::builtin())).unwrap();
    assert_eq!(to_document(&rebuilt), doc);
}

#[test]
fn single_item_list_is_written_structured() {
    let registry = CapabilityRegistry::builtin();
    let rule = rulegate::Rule {
        field: "tags".to_string(),
        capability: "Contains".to_string(),
        value: Operand::List(vec![json!("a")]),
        message: None,
    };
    let entry = to_entry(rule.clone());
    let RuleEntry::Binding(binding) = &entry else {
        panic!("expected structured form, got {:?}", entry);
    };
    assert_eq!(binding.value, Some(json!(["a"])));
    assert_eq!(rulegate::parse::parse_entry(&entry, &registry).unwrap(), rule);
}

#[test]
fn messages_the_dsl_would_change_are_written_structured() {
    let registry = CapabilityRegistry::builtin();
    for message in [" padded ", "Yes, really."] {
        let rule = rulegate::Rule {
            field: "a".to_string(),
            capability: "Equal".to_string(),
            value: Operand::from("1"),
            message: Some(message.to_string()),
        };
        let entry = to_entry(rule.clone());
        assert!(
            matches!(&entry, RuleEntry::Binding(_)),
            "{:?} should be structured, got {:?}",
            message,
            entry
        );
        assert_eq!(rulegate::parse::parse_entry(&entry, &registry).unwrap(), rule);
    }
}

#[test]
fn list_with_a_comma_in_the_message_stays_shorthand() {
    let registry = CapabilityRegistry::builtin();
    let rule = rulegate::parse_rule("ids:in:1,2:One, or two.", &registry).unwrap();
    let entry = to_entry(rule.clone());
    assert_eq!(entry, RuleEntry::Rule("ids:in:1,2:One, or two.".to_string()));
    assert_eq!(rulegate::parse::parse_entry(&entry, &registry).unwrap(), rule);
}

#[test]
fn serialize_omits_empty_sections() {
    let yaml = serialize(&RuleSetDocument::default()).unwrap();
    assert!(yaml.contains("strict"));
    assert!(!yaml.contains("conditions"));
    assert!(!yaml.contains("validators"));
}
