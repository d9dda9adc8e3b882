#![no_main]

use libfuzzer_sys::fuzz_target;
use rulegate::{CapabilityRegistry, parse_rule};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let registry = CapabilityRegistry::builtin();

    let Ok(rule) = parse_rule(&text, &registry) else {
        return;
    };

    // A parsed rule renders to text that parses again.
    let rendered = rule.to_string();
    if let Err(e) = parse_rule(&rendered, &registry) {
        panic!(
            "rendered rule does not parse: {}\nInput: {:?}\nRendered: {:?}",
            e, text, rendered
        );
    }
});
