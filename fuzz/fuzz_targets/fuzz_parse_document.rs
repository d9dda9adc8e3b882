#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    if let Ok(doc) = rulegate::parse_document(&s) {
        let registry = rulegate::CapabilityRegistry::builtin();
        let _ = rulegate::validate(&doc, &registry);
    }
});
