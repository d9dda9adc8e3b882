#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let Ok(doc) = rulegate::parse_document(&s) else {
        return;
    };
    let registry = Arc::new(rulegate::CapabilityRegistry::builtin());
    let Ok(set) = rulegate::build(&doc, registry) else {
        return;
    };

    let normalized = rulegate::serialize::to_document(&set);
    let yaml = match rulegate::serialize(&normalized) {
        Ok(y) => y,
        Err(_) => return,
    };

    // If we can serialize a built set, we must be able to parse it back unchanged.
    match rulegate::parse_document(&yaml) {
        Ok(parsed) if parsed == normalized => {}
        other => panic!(
            "Roundtrip failure: {:?}\n\
             Input (lossy): {:?}\n\
             Serialized YAML:\n{}",
            other.err(),
            s.get(..200).unwrap_or(&s),
            yaml.get(..500).unwrap_or(&yaml),
        ),
    }
});
