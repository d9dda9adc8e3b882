use proptest::prelude::*;
use rulegate::primitives::{as_number, compare_numbers, is_blank, loose_eq, truthy};
use serde_json::{Value, json};
use std::cmp::Ordering;

fn arb_json(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| json!(i)),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-z0-9]{0,6}".prop_map(Value::String),
    ];

    leaf.prop_recursive(depth, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|pairs| {
                let map: serde_json::Map<String, Value> = pairs.into_iter().collect();
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn loose_eq_is_reflexive(value in arb_json(3)) {
        prop_assert!(loose_eq(&value, &value));
    }

    #[test]
    fn loose_eq_is_symmetric(a in arb_json(2), b in arb_json(2)) {
        prop_assert_eq!(loose_eq(&a, &b), loose_eq(&b, &a));
    }

    #[test]
    fn numeric_text_equals_its_number(n in any::<i64>()) {
        prop_assert!(loose_eq(&json!(n), &json!(n.to_string())));
        let suffixed = format!("{}x", n);
        prop_assert!(!loose_eq(&json!(n), &json!(suffixed)));
    }

    #[test]
    fn bool_compares_by_truthiness(b in any::<bool>(), other in arb_json(2)) {
        prop_assert_eq!(loose_eq(&Value::Bool(b), &other), b == truthy(&other));
    }

    #[test]
    fn compare_numbers_is_antisymmetric(a in any::<i32>(), b in any::<i32>()) {
        let forward = compare_numbers(&json!(a), &json!(b.to_string()));
        let backward = compare_numbers(&json!(b.to_string()), &json!(a));
        prop_assert_eq!(forward, Some(a.cmp(&b)));
        prop_assert_eq!(backward.map(Ordering::reverse), forward);
    }

    #[test]
    fn words_are_not_numbers(word in "[a-df-z]{1,8}") {
        prop_assert_eq!(as_number(&json!(word)), None);
    }

    #[test]
    fn blank_values_are_not_truthy(value in arb_json(2)) {
        if is_blank(&value) {
            prop_assert!(!truthy(&value));
        }
    }
}
