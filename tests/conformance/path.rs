use rulegate::primitives;
use serde_json::Value;

use super::common::{load_suite, report_suite};

#[derive(Debug, serde::Deserialize)]
struct PathCase {
    id: String,
    name: String,
    input: PathInput,
    expected: Vec<Value>,
}

#[derive(Debug, serde::Deserialize)]
struct PathInput {
    path: String,
    value: Value,
}

#[test]
fn resolve_path_suite() {
    let cases: Vec<PathCase> = load_suite("path/resolve-path.yaml");

    let mut passed = 0;
    let mut failed = 0;

    for case in &cases {
        let result = primitives::resolve_path(&case.input.path, &case.input.value);

        if result == case.expected {
            passed += 1;
        } else {
            eprintln!(
                "  FAIL [{}] {}: expected {:?}, got {:?}",
                case.id, case.name, case.expected, result
            );
            failed += 1;
        }
    }

    report_suite("resolve_path", passed, failed, cases.len());
}

#[test]
fn lookup_field_simple_and_dotted() {
    let record = serde_json::json!({
        "name": "x",
        "users": [{"id": 1}, {"id": 2}]
    });
    assert_eq!(primitives::lookup_field(&record, "name"), vec![Value::from("x")]);
    assert_eq!(
        primitives::lookup_field(&record, "users.id"),
        vec![Value::from(1), Value::from(2)]
    );
    assert!(primitives::lookup_field(&record, "missing").is_empty());
}

#[test]
fn field_items_flattens_lists_and_drops_nulls() {
    let record = serde_json::json!({"ids": [1, null, 2], "none": null});
    assert_eq!(
        primitives::field_items(&record, "ids"),
        vec![Value::from(1), Value::from(2)]
    );
    assert!(primitives::field_items(&record, "none").is_empty());
}
