//! Capability registry: textual names mapped to constructors and operand shapes.
//!
//! Names are resolved once, when a rule or condition is declared. Lookups go
//! through the TitleCase form, so `greater_than` and `GreaterThan` address
//! the same entry while `greaterthan` and `GREATER_THAN` address none.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::capabilities::{BUILTIN_CAPABILITIES, Builtin, BuiltinKind};
use crate::enums::OperandShape;
use crate::error::ConfigError;
use crate::types::Operand;

/// A named leaf predicate bound to its operand.
///
/// Implementations must be cheap to construct; the engine builds a fresh
/// instance per declared rule and, for conditions, per evaluation.
pub trait Capability: Send + Sync + fmt::Debug {
    /// Canonical registered name.
    fn name(&self) -> &str;

    fn operand(&self) -> &Operand;

    /// Replaces the operand, re-checking it.
    fn set_operand(&mut self, operand: Operand) -> Result<(), ConfigError>;

    /// The custom message if one was given, otherwise a default derived from
    /// the operand.
    fn message(&self) -> String;

    /// `Ok(false)` is an ordinary failure. `Err` means the capability cannot
    /// judge this input at all.
    fn evaluate(&self, input: &Value) -> Result<bool, ConfigError>;
}

/// Builds a custom capability from an already-shaped operand and an optional message.
pub type CustomConstructor =
    Arc<dyn Fn(Operand, Option<String>) -> Result<Box<dyn Capability>, ConfigError> + Send + Sync>;

#[derive(Clone)]
pub enum Constructor {
    Builtin(BuiltinKind),
    Custom(CustomConstructor),
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Builtin(kind) => f.debug_tuple("Builtin").field(kind).finish(),
            Constructor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A resolved registry entry.
#[derive(Clone, Debug)]
pub struct CapabilityEntry {
    pub name: String,
    pub shape: OperandShape,
    pub constructor: Constructor,
}

impl CapabilityEntry {
    /// Constructs an instance from an operand that is already shaped.
    pub fn construct(
        &self,
        operand: Operand,
        message: Option<String>,
    ) -> Result<Box<dyn Capability>, ConfigError> {
        match &self.constructor {
            Constructor::Builtin(kind) => Ok(Box::new(Builtin::new(*kind, operand, message)?)),
            Constructor::Custom(build) => build(operand, message),
        }
    }

    /// Shapes a raw operand for `field`, then constructs.
    pub fn bind(
        &self,
        field: &str,
        operand: Operand,
        message: Option<String>,
    ) -> Result<Box<dyn Capability>, ConfigError> {
        self.construct(operand.shaped(self.shape, field), message)
    }
}

/// Name → constructor lookup table.
#[derive(Clone, Debug)]
pub struct CapabilityRegistry {
    entries: Vec<CapabilityEntry>,
    index: HashMap<String, usize>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityRegistry {
    /// A registry with no capabilities.
    pub fn empty() -> Self {
        CapabilityRegistry {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// A registry holding every built-in capability.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for entry in BUILTIN_CAPABILITIES {
            registry.insert(CapabilityEntry {
                name: entry.name.to_string(),
                shape: entry.shape,
                constructor: Constructor::Builtin(entry.kind),
            });
        }
        registry
    }

    /// Registers a custom capability, replacing any entry of the same name.
    pub fn register<F>(&mut self, name: &str, shape: OperandShape, constructor: F) -> &mut Self
    where
        F: Fn(Operand, Option<String>) -> Result<Box<dyn Capability>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(CapabilityEntry {
            name: snake_case_to_title_case(name),
            shape,
            constructor: Constructor::Custom(Arc::new(constructor)),
        });
        self
    }

    fn insert(&mut self, entry: CapabilityEntry) {
        let key = lookup_key(&entry.name);
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityEntry> {
        self.index
            .get(&lookup_key(name))
            .map(|&idx| &self.entries[idx])
    }

    /// Like [`get`](Self::get), failing with `UnknownCapability`.
    pub fn resolve(&self, name: &str) -> Result<&CapabilityEntry, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::UnknownCapability {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn shape_of(&self, name: &str) -> Option<OperandShape> {
        self.get(name).map(|entry| entry.shape)
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `greater_than` and `GreaterThan` share a key; `greaterthan` does not.
fn lookup_key(name: &str) -> String {
    snake_case_to_title_case(name)
}

// ─── Name conversion ────────────────────────────────────────────────────────

/// `greater_than` → `GreaterThan`. Names without underscores only get their
/// first letter raised.
pub fn snake_case_to_title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `GreaterThan` → `greater_than`.
pub fn title_case_to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `(TitleCase, snake_case)` pairs for every built-in capability.
pub fn available_capabilities() -> Vec<(&'static str, String)> {
    BUILTIN_CAPABILITIES
        .iter()
        .map(|entry| (entry.name, title_case_to_snake_case(entry.name)))
        .collect()
}
