//! Condition-gated validation of nested records.
//!
//! A [`ValidatorSet`] binds fields of a record (any `serde_json::Value`, as
//! decoded from JSON, YAML or form input) to named capabilities, optionally
//! gated by [`Condition`]s. Rules are written in a small DSL:
//!
//! ```text
//! field:capability[:value[,value]*][:message]
//! ```
//!
//! Dotted fields (`users.email`) address every matching value in nested maps
//! and lists. Conditions run first; whether all or only some of them must
//! pass, and likewise for validators, is set by [`StrictMode`].
//!
//! # Quick Start
//!
//! ```rust
//! use rulegate::{StrictMode, ValidatorSet};
//! use serde_json::json;
//!
//! let mut set = ValidatorSet::from_rules(
//!     ["user_id:equal:1", "logins:greater_than:0:Must have logged in."],
//!     StrictMode::Both,
//! )
//! .expect("valid rules");
//! set.add_condition_from_rule("country:equal:US").expect("valid condition");
//!
//! let report = set
//!     .evaluate(&json!({"country": "US", "user_id": 1, "logins": 0}))
//!     .expect("well-formed configuration");
//! assert!(!report.passed);
//! assert_eq!(report.errors("logins"), ["Must have logged in."]);
//! ```
//!
//! Rule sets can also be declared in YAML and loaded with [`load`]:
//!
//! ```rust
//! let yaml = r#"
//! strict: validations_only
//! conditions:
//!   - "country:equal:US"
//! validators:
//!   - "username:not_empty"
//!   - field: logins
//!     capability: greater_than
//!     value: 0
//! "#;
//!
//! let set = rulegate::load(yaml).expect("valid document");
//! let report = set
//!     .evaluate(&serde_json::json!({"country": "UK", "username": "", "logins": 0}))
//!     .expect("well-formed configuration");
//! assert!(report.passed && report.exempt);
//! ```
//!
//! # Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `datetime` | yes     | `DateTimeBetween` and `DateTimeBetweenInclude`, backed by [`chrono`]. |

pub mod capabilities;
pub mod condition;
pub mod enums;
pub mod error;
pub mod evaluate;
pub mod parse;
pub mod primitives;
pub mod registry;
pub mod serialize;
pub mod types;
pub mod validate;

mod has;

pub use condition::Condition;
pub use enums::*;
pub use error::*;
pub use evaluate::{Binding, ValidatorSet};
pub use registry::{Capability, CapabilityEntry, CapabilityRegistry};
pub use types::*;

// Re-export entry-point functions at the crate root for convenience.
pub use parse::{parse_document, parse_rule};
pub use primitives::resolve_path;
pub use serialize::serialize;
pub use validate::validate;

use std::sync::Arc;

/// Build a validator set from an already validated document.
///
/// # Errors
///
/// The first rule that does not parse or names an unknown capability.
pub fn build(
    doc: &RuleSetDocument,
    registry: Arc<CapabilityRegistry>,
) -> Result<ValidatorSet, ConfigError> {
    let mut set = ValidatorSet::with_registry(registry);
    set.set_strict(doc.strict);
    for entry in &doc.conditions {
        let rule = parse::parse_entry(entry, set.registry())?;
        let condition = Condition::from_parsed(rule, set.registry())?;
        set.add_condition(condition);
    }
    for entry in &doc.validators {
        let rule = parse::parse_entry(entry, set.registry())?;
        set.add_rule(rule)?;
    }
    Ok(set)
}

/// Convenience entry point composing parse → validate → build with the
/// built-in capabilities.
///
/// # Errors
///
/// Returns `Err(Vec<RulegateError>)` if parsing fails or validation finds
/// errors; validation errors are all reported at once.
pub fn load(input: &str) -> Result<ValidatorSet, Vec<RulegateError>> {
    load_with_registry(input, Arc::new(CapabilityRegistry::builtin()))
}

/// [`load`] against a custom registry.
pub fn load_with_registry(
    input: &str,
    registry: Arc<CapabilityRegistry>,
) -> Result<ValidatorSet, Vec<RulegateError>> {
    let doc = parse::parse_document(input).map_err(|e| vec![RulegateError::Parse(e)])?;

    let result = validate::validate(&doc, &registry);
    if !result.errors.is_empty() {
        return Err(result
            .errors
            .into_iter()
            .map(RulegateError::Validation)
            .collect());
    }
    for warning in &result.warnings {
        tracing::warn!(code = %warning.code, path = ?warning.path, "{}", warning.message);
    }

    build(&doc, registry).map_err(|e| vec![RulegateError::Config(e)])
}
