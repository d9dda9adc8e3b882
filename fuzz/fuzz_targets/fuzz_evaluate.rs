#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rulegate::{StrictMode, ValidatorSet};

#[derive(Arbitrary, Debug)]
struct Input {
    rules: Vec<String>,
    conditions: Vec<String>,
    strict: u8,
    record: String,
}

fuzz_target!(|input: Input| {
    let Ok(record) = serde_json::from_str::<serde_json::Value>(&input.record) else {
        return;
    };
    let strict = StrictMode::from_level(i64::from(input.strict % 4)).unwrap_or_default();

    let Ok(mut set) = ValidatorSet::from_rules(&input.rules, strict) else {
        return;
    };
    if set.add_conditions_from_rules(&input.conditions).is_err() {
        return;
    }

    // Configuration errors are fine; panics are not.
    if let Ok(report) = set.evaluate(&record) {
        assert!(!report.exempt || report.passed);
        assert!(report.exempt || report.validation_status.is_some());
    }
});
