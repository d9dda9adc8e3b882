//! The validator set: declared bindings, loaded capabilities, conditions and
//! the two-phase evaluation that turns a record into a [`Report`].
//!
//! Evaluation never mutates the set. Bindings that have no loaded instance
//! yet are materialized per call, so validators declared after
//! [`ValidatorSet::load_validators`] still run.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::condition::{Condition, resolve_references};
use crate::enums::*;
use crate::error::ConfigError;
use crate::parse::parse_rule;
use crate::primitives::{is_dotted, resolve_path};
use crate::registry::{Capability, CapabilityEntry, CapabilityRegistry};
use crate::types::*;

/// A declared, not yet instantiated validator.
#[derive(Clone, Debug)]
pub struct Binding {
    entry: CapabilityEntry,
    value: Operand,
    message: Option<String>,
}

impl Binding {
    pub fn capability(&self) -> &str {
        &self.entry.name
    }

    pub fn shape(&self) -> OperandShape {
        self.entry.shape
    }

    /// The shaped operand as declared, references unresolved.
    pub fn value(&self) -> &Operand {
        &self.value
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Instantiate against `input`, resolving cross-field references.
    pub fn materialize(&self, input: &Value) -> Result<Box<dyn Capability>, ConfigError> {
        self.entry.construct(
            resolve_references(&self.value, input),
            self.message.clone(),
        )
    }
}

#[derive(Debug)]
struct FieldSpecs {
    field: String,
    bindings: Vec<Binding>,
}

#[derive(Debug)]
struct LoadedField {
    field: String,
    capabilities: Vec<Box<dyn Capability>>,
    /// Leading bindings of this field already instantiated into `capabilities`.
    materialized: usize,
}

/// An ordered collection of validators and conditions over one kind of record.
///
/// Fields keep the order in which they were first declared.
#[derive(Debug)]
pub struct ValidatorSet {
    registry: Arc<CapabilityRegistry>,
    specs: Vec<FieldSpecs>,
    loaded: Vec<LoadedField>,
    conditions: Vec<Condition>,
    strict: StrictMode,
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorSet {
    /// An empty set over the built-in capabilities, strict for both phases.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(CapabilityRegistry::builtin()))
    }

    pub fn with_registry(registry: Arc<CapabilityRegistry>) -> Self {
        ValidatorSet {
            registry,
            specs: Vec::new(),
            loaded: Vec::new(),
            conditions: Vec::new(),
            strict: StrictMode::default(),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Build a set from rule strings.
    pub fn from_rules<I, S>(rules: I, strict: StrictMode) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.set_strict(strict);
        set.add_validators_from_rules(rules)?;
        Ok(set)
    }

    /// Build a set declaring `(capability, value)` pairs on one field.
    pub fn add<I, N, V>(field: &str, validators: I, strict: StrictMode) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Operand>,
    {
        let mut set = Self::new();
        set.set_strict(strict);
        set.add_validators_to_field(field, validators)?;
        Ok(set)
    }

    /// Build a set from ready-made instances on one field. There is no record
    /// yet, so operands are kept as given.
    pub fn load<I>(field: &str, capabilities: I, strict: StrictMode) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Box<dyn Capability>>,
    {
        let mut set = Self::new();
        set.set_strict(strict);
        set.loaded_field_mut(field).capabilities.extend(capabilities);
        Ok(set)
    }

    // ─── Declaring validators ───────────────────────────────────────────────

    /// Declare a validator. The capability is resolved now; its instance is
    /// built when the set is loaded or evaluated, once references in the
    /// value can be resolved, so operand problems surface then.
    pub fn add_validator(
        &mut self,
        field: &str,
        capability: &str,
        value: impl Into<Operand>,
    ) -> Result<&mut Self, ConfigError> {
        self.declare(field, capability, value.into(), None)
    }

    pub fn add_validator_with_message(
        &mut self,
        field: &str,
        capability: &str,
        value: impl Into<Operand>,
        message: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.declare(field, capability, value.into(), Some(message.into()))
    }

    pub fn add_validators_to_field<I, N, V>(
        &mut self,
        field: &str,
        validators: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Operand>,
    {
        for (capability, value) in validators {
            self.declare(field, capability.as_ref(), value.into(), None)?;
        }
        Ok(self)
    }

    /// Declare validators for several fields: field → `(capability, value)` pairs.
    pub fn add_validators<I, F, J, N, V>(&mut self, validators: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = (F, J)>,
        F: AsRef<str>,
        J: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Operand>,
    {
        for (field, pairs) in validators {
            self.add_validators_to_field(field.as_ref(), pairs)?;
        }
        Ok(self)
    }

    pub fn add_validator_from_rule(&mut self, rule: &str) -> Result<&mut Self, ConfigError> {
        let rule = parse_rule(rule, &self.registry)?;
        self.add_rule(rule)
    }

    pub fn add_validators_from_rules<I, S>(&mut self, rules: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            self.add_validator_from_rule(rule.as_ref())?;
        }
        Ok(self)
    }

    /// Declare an already-parsed rule.
    pub fn add_rule(&mut self, rule: Rule) -> Result<&mut Self, ConfigError> {
        self.declare(&rule.field, &rule.capability, rule.value, rule.message)
    }

    fn declare(
        &mut self,
        field: &str,
        capability: &str,
        value: Operand,
        message: Option<String>,
    ) -> Result<&mut Self, ConfigError> {
        let entry = self.registry.resolve(capability)?.clone();
        let binding = Binding {
            value: value.shaped(entry.shape, field),
            entry,
            message,
        };

        match self.specs.iter_mut().find(|s| s.field == field) {
            Some(specs) => specs.bindings.push(binding),
            None => self.specs.push(FieldSpecs {
                field: field.to_string(),
                bindings: vec![binding],
            }),
        }
        Ok(self)
    }

    // ─── Loading instances ──────────────────────────────────────────────────

    /// Add a ready-made instance to `field`. A bare operand naming a key of
    /// `input` (or a `"[name]"` reference) is replaced by that key's value.
    /// A null `input` means no record, and the operand is kept.
    pub fn load_validator(
        &mut self,
        field: &str,
        mut capability: Box<dyn Capability>,
        input: &Value,
    ) -> Result<&mut Self, ConfigError> {
        if !input.is_null() {
            let resolved = resolve_references(capability.operand(), input);
            if &resolved != capability.operand() {
                capability.set_operand(resolved)?;
            }
        }
        self.loaded_field_mut(field).capabilities.push(capability);
        Ok(self)
    }

    pub fn load_validators_to_field<I>(
        &mut self,
        field: &str,
        capabilities: I,
        input: &Value,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Box<dyn Capability>>,
    {
        for capability in capabilities {
            self.load_validator(field, capability, input)?;
        }
        Ok(self)
    }

    /// Instantiate every declared binding that has no instance yet.
    pub fn load_validators(&mut self, input: &Value) -> Result<&mut Self, ConfigError> {
        for idx in 0..self.specs.len() {
            let field = self.specs[idx].field.clone();
            let done = self.loaded_field(&field).map_or(0, |loaded| loaded.materialized);
            let pending = self.specs[idx].bindings[done..]
                .iter()
                .map(|binding| binding.materialize(input))
                .collect::<Result<Vec<_>, _>>()?;
            if pending.is_empty() {
                continue;
            }
            let loaded = self.loaded_field_mut(&field);
            loaded.materialized += pending.len();
            loaded.capabilities.extend(pending);
        }
        Ok(self)
    }

    fn loaded_field(&self, field: &str) -> Option<&LoadedField> {
        self.loaded.iter().find(|loaded| loaded.field == field)
    }

    fn loaded_field_mut(&mut self, field: &str) -> &mut LoadedField {
        let idx = match self.loaded.iter().position(|loaded| loaded.field == field) {
            Some(idx) => idx,
            None => {
                self.loaded.push(LoadedField {
                    field: field.to_string(),
                    capabilities: Vec::new(),
                    materialized: 0,
                });
                self.loaded.len() - 1
            }
        };
        &mut self.loaded[idx]
    }

    // ─── Conditions ─────────────────────────────────────────────────────────

    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    pub fn add_conditions<I>(&mut self, conditions: I) -> &mut Self
    where
        I: IntoIterator<Item = Condition>,
    {
        self.conditions.extend(conditions);
        self
    }

    pub fn add_condition_from_rule(&mut self, rule: &str) -> Result<&mut Self, ConfigError> {
        let condition = Condition::from_rule(rule, &self.registry)?;
        Ok(self.add_condition(condition))
    }

    pub fn add_conditions_from_rules<I, S>(&mut self, rules: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            self.add_condition_from_rule(rule.as_ref())?;
        }
        Ok(self)
    }

    // ─── Strictness ─────────────────────────────────────────────────────────

    pub fn set_strict(&mut self, strict: StrictMode) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Numeric form: 0 none, 1 validations only, 2 conditions only, 3 both.
    pub fn set_strict_level(&mut self, level: i64) -> Result<&mut Self, ConfigError> {
        self.strict = StrictMode::from_level(level)?;
        Ok(self)
    }

    pub fn strict(&self) -> StrictMode {
        self.strict
    }

    /// Anything but [`StrictMode::None`].
    pub fn is_strict(&self) -> bool {
        self.strict != StrictMode::None
    }

    // ─── Inspection ─────────────────────────────────────────────────────────

    /// Declared bindings for `field`.
    pub fn validators(&self, field: &str) -> &[Binding] {
        self.specs
            .iter()
            .find(|s| s.field == field)
            .map_or(&[][..], |s| s.bindings.as_slice())
    }

    /// Fields with declared bindings, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.field.as_str())
    }

    pub fn has_validators(&self) -> bool {
        !self.specs.is_empty()
    }

    pub fn has_field_validators(&self, field: &str) -> bool {
        self.specs.iter().any(|s| s.field == field)
    }

    /// Loaded instances for `field`.
    pub fn loaded_validators(&self, field: &str) -> &[Box<dyn Capability>] {
        self.loaded_field(field)
            .map_or(&[][..], |loaded| loaded.capabilities.as_slice())
    }

    pub fn has_loaded_validators(&self) -> bool {
        self.loaded.iter().any(|loaded| !loaded.capabilities.is_empty())
    }

    pub fn is_loaded(&self, field: &str) -> bool {
        self.loaded_field(field).is_some()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    // ─── Evaluation ─────────────────────────────────────────────────────────

    /// Run the conditions only; `true` when the gate opens.
    pub fn evaluate_conditions(&self, input: &Value) -> Result<bool, ConfigError> {
        let (_, open) = self.run_conditions(input)?;
        Ok(open)
    }

    fn run_conditions(&self, input: &Value) -> Result<(Vec<ConditionOutcome>, bool), ConfigError> {
        let mut outcomes = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let passed = condition.evaluate(input)?;
            outcomes.push(ConditionOutcome {
                field: condition.field().to_string(),
                capability: condition.capability().to_string(),
                passed,
                message: condition.message().map(str::to_string),
            });
        }
        let passed = outcomes.iter().filter(|o| o.passed).count();
        let status = PassStatus::from_counts(outcomes.len(), passed);
        let open = if self.strict.conditions_strict() {
            status == PassStatus::All
        } else {
            status.any_passed()
        };
        Ok((outcomes, open))
    }

    /// Evaluate `input`: conditions first, then, if the gate opens, every
    /// validator.
    ///
    /// A closed gate exempts the record: the report passes and no validator
    /// runs. Predicate failures are recorded in the report; only
    /// configuration problems are returned as `Err`.
    pub fn evaluate(&self, input: &Value) -> Result<Report, ConfigError> {
        let mut report = Report::new(self.strict);

        if self.has_conditions() {
            let (outcomes, open) = self.run_conditions(input)?;
            let passed = outcomes.iter().filter(|o| o.passed).count();
            let status = PassStatus::from_counts(outcomes.len(), passed);
            report.condition_status = Some(status);
            report.conditions = outcomes;
            if !open {
                debug!(
                    strict = %self.strict,
                    status = ?status,
                    "condition gate closed, record exempt from validation"
                );
                report.exempt = true;
                report.passed = true;
                return Ok(report);
            }
        }

        for loaded in &self.loaded {
            for capability in &loaded.capabilities {
                run_capability(&loaded.field, capability.as_ref(), input, &mut report)?;
            }
            let pending = self
                .specs
                .iter()
                .find(|s| s.field == loaded.field)
                .map_or(&[][..], |s| &s.bindings[loaded.materialized.min(s.bindings.len())..]);
            if !pending.is_empty() {
                debug!(field = %loaded.field, count = pending.len(), "materializing late-added validators");
            }
            for binding in pending {
                let capability = binding.materialize(input)?;
                run_capability(&loaded.field, capability.as_ref(), input, &mut report)?;
            }
        }

        for specs in self.specs.iter().filter(|s| !self.is_loaded(&s.field)) {
            for binding in &specs.bindings {
                let capability = binding.materialize(input)?;
                run_capability(&specs.field, capability.as_ref(), input, &mut report)?;
            }
        }

        let total = report.fields.iter().map(|f| f.evaluated.len()).sum();
        let passed = report
            .fields
            .iter()
            .flat_map(|f| f.evaluated.iter())
            .filter(|passed| **passed)
            .count();
        let status = PassStatus::from_counts(total, passed);
        report.validation_status = Some(status);
        report.passed = if self.strict.validations_strict() {
            !report.has_errors()
        } else {
            status.any_passed()
        };
        debug!(
            passed = report.passed,
            status = ?status,
            failing_fields = report.error_field_count(),
            "validation finished"
        );
        Ok(report)
    }
}

/// The value a capability bound to `field` is run against.
///
/// Field-addressed capabilities always get the whole record. Others get the
/// field's value when present and not null (for a dotted field, the single
/// match or the list of matches), otherwise the whole record.
fn subject_for<'a>(field: &str, capability: &dyn Capability, input: &'a Value) -> SubjectRef<'a> {
    if capability.operand().target_field().is_some() {
        return SubjectRef::Borrowed(input);
    }
    if is_dotted(field) {
        let mut matches = resolve_path(field, input);
        return match matches.len() {
            0 => SubjectRef::Borrowed(input),
            1 => SubjectRef::Owned(matches.pop().unwrap_or(Value::Null)),
            _ => SubjectRef::Owned(Value::Array(matches)),
        };
    }
    match input.get(field) {
        Some(value) if !value.is_null() => SubjectRef::Borrowed(value),
        _ => SubjectRef::Borrowed(input),
    }
}

enum SubjectRef<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl SubjectRef<'_> {
    fn as_value(&self) -> &Value {
        match self {
            SubjectRef::Borrowed(value) => value,
            SubjectRef::Owned(value) => value,
        }
    }
}

fn run_capability(
    field: &str,
    capability: &dyn Capability,
    input: &Value,
    report: &mut Report,
) -> Result<(), ConfigError> {
    let subject = subject_for(field, capability, input);
    let passed = capability.evaluate(subject.as_value())?;
    trace!(field, capability = capability.name(), passed, "validator evaluated");
    report.record(field, passed, || capability.message());
    Ok(())
}
