//! Built-in leaf capabilities.
//!
//! Every built-in is a [`Builtin`] carrying a [`BuiltinKind`]; the kinds that
//! inspect a named field of the record are evaluated in the private `has` module.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use crate::enums::OperandShape;
use crate::error::ConfigError;
use crate::has;
use crate::primitives::*;
use crate::registry::Capability;
use crate::types::Operand;

// ─── Kinds ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Accepted,
    Declined,
    Alpha,
    AlphaNumeric,
    Numeric,
    Between,
    BetweenInclude,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    CountEqual,
    CountNotEqual,
    CountGreaterThan,
    CountGreaterThanEqual,
    CountLessThan,
    CountLessThanEqual,
    CreditCard,
    #[cfg(feature = "datetime")]
    DateTimeBetween,
    #[cfg(feature = "datetime")]
    DateTimeBetweenInclude,
    Email,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    In,
    NotIn,
    Included,
    Excluded,
    Ipv4,
    Ipv6,
    IsSubnetOf,
    IsJson,
    Length,
    LengthBetween,
    LengthBetweenInclude,
    LengthGt,
    LengthGte,
    LengthLt,
    LengthLte,
    NotEmpty,
    IsEmpty,
    RegEx,
    HasOneThatEquals,
    HasOnlyOneThatEquals,
    HasOneThatContains,
    HasOnlyOneThatContains,
    HasOneGreaterThan,
    HasOneGreaterThanEqual,
    HasOneLessThan,
    HasOneLessThanEqual,
    HasCountEqual,
    HasCountNotEqual,
    HasCountGreaterThan,
    HasCountGreaterThanEqual,
    HasCountLessThan,
    HasCountLessThanEqual,
    HasOne,
    HasOnlyOne,
    HasOneNotEmpty,
    Required,
}

/// A built-in registry entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinEntry {
    pub name: &'static str,
    pub shape: OperandShape,
    pub kind: BuiltinKind,
}

const fn scalar(name: &'static str, kind: BuiltinKind) -> BuiltinEntry {
    BuiltinEntry {
        name,
        shape: OperandShape::Scalar,
        kind,
    }
}

const fn keyed(name: &'static str, kind: BuiltinKind) -> BuiltinEntry {
    BuiltinEntry {
        name,
        shape: OperandShape::FieldKeyed,
        kind,
    }
}

const fn named(name: &'static str, kind: BuiltinKind) -> BuiltinEntry {
    BuiltinEntry {
        name,
        shape: OperandShape::FieldName,
        kind,
    }
}

/// Every built-in capability, in documentation order.
pub static BUILTIN_CAPABILITIES: &[BuiltinEntry] = &[
    scalar("Accepted", BuiltinKind::Accepted),
    scalar("Declined", BuiltinKind::Declined),
    scalar("Alpha", BuiltinKind::Alpha),
    scalar("AlphaNumeric", BuiltinKind::AlphaNumeric),
    scalar("Numeric", BuiltinKind::Numeric),
    scalar("Between", BuiltinKind::Between),
    scalar("BetweenInclude", BuiltinKind::BetweenInclude),
    scalar("Contains", BuiltinKind::Contains),
    scalar("NotContains", BuiltinKind::NotContains),
    scalar("StartsWith", BuiltinKind::StartsWith),
    scalar("EndsWith", BuiltinKind::EndsWith),
    scalar("CountEqual", BuiltinKind::CountEqual),
    scalar("CountNotEqual", BuiltinKind::CountNotEqual),
    scalar("CountGreaterThan", BuiltinKind::CountGreaterThan),
    scalar("CountGreaterThanEqual", BuiltinKind::CountGreaterThanEqual),
    scalar("CountLessThan", BuiltinKind::CountLessThan),
    scalar("CountLessThanEqual", BuiltinKind::CountLessThanEqual),
    scalar("CreditCard", BuiltinKind::CreditCard),
    #[cfg(feature = "datetime")]
    scalar("DateTimeBetween", BuiltinKind::DateTimeBetween),
    #[cfg(feature = "datetime")]
    scalar("DateTimeBetweenInclude", BuiltinKind::DateTimeBetweenInclude),
    scalar("Email", BuiltinKind::Email),
    scalar("Equal", BuiltinKind::Equal),
    scalar("NotEqual", BuiltinKind::NotEqual),
    scalar("GreaterThan", BuiltinKind::GreaterThan),
    scalar("GreaterThanEqual", BuiltinKind::GreaterThanEqual),
    scalar("LessThan", BuiltinKind::LessThan),
    scalar("LessThanEqual", BuiltinKind::LessThanEqual),
    scalar("In", BuiltinKind::In),
    scalar("NotIn", BuiltinKind::NotIn),
    scalar("Included", BuiltinKind::Included),
    scalar("Excluded", BuiltinKind::Excluded),
    scalar("Ipv4", BuiltinKind::Ipv4),
    scalar("Ipv6", BuiltinKind::Ipv6),
    scalar("IsSubnetOf", BuiltinKind::IsSubnetOf),
    scalar("IsJson", BuiltinKind::IsJson),
    scalar("Length", BuiltinKind::Length),
    scalar("LengthBetween", BuiltinKind::LengthBetween),
    scalar("LengthBetweenInclude", BuiltinKind::LengthBetweenInclude),
    scalar("LengthGt", BuiltinKind::LengthGt),
    scalar("LengthGte", BuiltinKind::LengthGte),
    scalar("LengthLt", BuiltinKind::LengthLt),
    scalar("LengthLte", BuiltinKind::LengthLte),
    scalar("NotEmpty", BuiltinKind::NotEmpty),
    scalar("IsEmpty", BuiltinKind::IsEmpty),
    scalar("RegEx", BuiltinKind::RegEx),
    // Inspect a named field of the record
    keyed("HasOneThatEquals", BuiltinKind::HasOneThatEquals),
    keyed("HasOnlyOneThatEquals", BuiltinKind::HasOnlyOneThatEquals),
    keyed("HasOneThatContains", BuiltinKind::HasOneThatContains),
    keyed("HasOnlyOneThatContains", BuiltinKind::HasOnlyOneThatContains),
    keyed("HasOneGreaterThan", BuiltinKind::HasOneGreaterThan),
    keyed("HasOneGreaterThanEqual", BuiltinKind::HasOneGreaterThanEqual),
    keyed("HasOneLessThan", BuiltinKind::HasOneLessThan),
    keyed("HasOneLessThanEqual", BuiltinKind::HasOneLessThanEqual),
    keyed("HasCountEqual", BuiltinKind::HasCountEqual),
    keyed("HasCountNotEqual", BuiltinKind::HasCountNotEqual),
    keyed("HasCountGreaterThan", BuiltinKind::HasCountGreaterThan),
    keyed("HasCountGreaterThanEqual", BuiltinKind::HasCountGreaterThanEqual),
    keyed("HasCountLessThan", BuiltinKind::HasCountLessThan),
    keyed("HasCountLessThanEqual", BuiltinKind::HasCountLessThanEqual),
    // Inspect the contents of the bound field itself
    named("HasOne", BuiltinKind::HasOne),
    named("HasOnlyOne", BuiltinKind::HasOnlyOne),
    named("HasOneNotEmpty", BuiltinKind::HasOneNotEmpty),
    named("Required", BuiltinKind::Required),
];

impl BuiltinKind {
    fn entry(self) -> Option<&'static BuiltinEntry> {
        BUILTIN_CAPABILITIES.iter().find(|entry| entry.kind == self)
    }

    pub fn name(self) -> &'static str {
        self.entry().map_or("", |entry| entry.name)
    }

    pub fn shape(self) -> OperandShape {
        self.entry().map_or(OperandShape::Scalar, |entry| entry.shape)
    }
}

// ─── Builtin ────────────────────────────────────────────────────────────────

/// A built-in capability bound to a checked operand.
#[derive(Clone, Debug)]
pub struct Builtin {
    kind: BuiltinKind,
    operand: Operand,
    message: Option<String>,
    /// Compiled patterns, only for `RegEx`.
    patterns: Vec<Regex>,
}

impl Builtin {
    /// Checks the operand against the kind. Operand problems surface here,
    /// never at evaluation.
    pub fn new(
        kind: BuiltinKind,
        operand: Operand,
        message: Option<String>,
    ) -> Result<Self, ConfigError> {
        let patterns = prepare(kind, &operand)?;
        Ok(Builtin {
            kind,
            operand,
            message,
            patterns,
        })
    }

    pub fn kind(&self) -> BuiltinKind {
        self.kind
    }
}

impl Capability for Builtin {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn set_operand(&mut self, operand: Operand) -> Result<(), ConfigError> {
        self.patterns = prepare(self.kind, &operand)?;
        self.operand = operand;
        Ok(())
    }

    fn message(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => default_message(self.kind, &self.operand),
        }
    }

    fn evaluate(&self, input: &Value) -> Result<bool, ConfigError> {
        match self.kind.shape() {
            OperandShape::Scalar => self.evaluate_scalar(input),
            OperandShape::FieldKeyed | OperandShape::FieldName => {
                has::evaluate(self.kind, &self.operand, input)
            }
        }
    }
}

impl Builtin {
    fn evaluate_scalar(&self, input: &Value) -> Result<bool, ConfigError> {
        use BuiltinKind as K;

        let name = self.kind.name();
        let operand = &self.operand;
        let result = match self.kind {
            K::Accepted => accepted(input),
            K::Declined => declined(input),
            K::Alpha => text_all(input, |c| c.is_ascii_alphabetic()),
            K::AlphaNumeric => text_all(input, |c| c.is_ascii_alphanumeric()),
            K::Numeric => as_number(input).is_some(),
            K::Between | K::BetweenInclude => {
                let (low, high) = number_pair(name, operand)?;
                as_number(input).is_some_and(|n| {
                    within(n, low, high, self.kind == K::BetweenInclude)
                })
            }
            K::Contains => contains_all(input, operand),
            K::NotContains => !contains_any(input, operand),
            K::StartsWith => text_pair(input, operand).is_some_and(|(s, p)| s.starts_with(&p)),
            K::EndsWith => text_pair(input, operand).is_some_and(|(s, p)| s.ends_with(&p)),
            K::CountEqual
            | K::CountNotEqual
            | K::CountGreaterThan
            | K::CountGreaterThanEqual
            | K::CountLessThan
            | K::CountLessThanEqual => {
                let expected = number_operand(name, operand)?;
                let count = count_of(name, input)? as f64;
                match self.kind {
                    K::CountEqual => count == expected,
                    K::CountNotEqual => count != expected,
                    K::CountGreaterThan => count > expected,
                    K::CountGreaterThanEqual => count >= expected,
                    K::CountLessThan => count < expected,
                    _ => count <= expected,
                }
            }
            K::CreditCard => value_text(input).is_some_and(|text| luhn_valid(&text)),
            #[cfg(feature = "datetime")]
            K::DateTimeBetween | K::DateTimeBetweenInclude => {
                let (low, high) = datetime_pair(name, operand)?;
                value_text(input)
                    .and_then(|text| parse_datetime(&text))
                    .is_some_and(|at| {
                        if self.kind == K::DateTimeBetweenInclude {
                            low <= at && at <= high
                        } else {
                            low < at && at < high
                        }
                    })
            }
            K::Email => value_text(input).is_some_and(|text| EMAIL_RE.is_match(&text)),
            K::Equal => loose_eq(input, &operand.to_value()),
            K::NotEqual => !loose_eq(input, &operand.to_value()),
            K::GreaterThan | K::GreaterThanEqual | K::LessThan | K::LessThanEqual => {
                number_operand(name, operand)?;
                let ordering = operand
                    .as_scalar()
                    .and_then(|expected| compare_numbers(input, expected));
                ordering.is_some_and(|ordering| matches_ordering(self.kind, ordering))
            }
            K::In => operand_values(operand).iter().any(|v| loose_eq(input, v)),
            K::NotIn => !operand_values(operand).iter().any(|v| loose_eq(input, v)),
            K::Included => included(input, operand),
            K::Excluded => excluded(input, operand),
            K::Ipv4 => value_text(input).is_some_and(|text| text.parse::<Ipv4Addr>().is_ok()),
            K::Ipv6 => value_text(input).is_some_and(|text| text.parse::<Ipv6Addr>().is_ok()),
            K::IsSubnetOf => {
                let (network, mask) = subnet_operand(name, operand)?;
                let address = value_text(input)
                    .and_then(|text| text.parse::<Ipv4Addr>().ok())
                    .ok_or_else(|| {
                        ConfigError::input(name, "the IP address must be a valid IPv4 address")
                    })?;
                u32::from(address) & mask == network
            }
            K::IsJson => match input {
                Value::String(text) => serde_json::from_str::<Value>(text).is_ok(),
                _ => false,
            },
            K::Length | K::LengthGt | K::LengthGte | K::LengthLt | K::LengthLte => {
                let expected = number_operand(name, operand)?;
                text_len(input).is_some_and(|len| {
                    let len = len as f64;
                    match self.kind {
                        K::Length => len == expected,
                        K::LengthGt => len > expected,
                        K::LengthGte => len >= expected,
                        K::LengthLt => len < expected,
                        _ => len <= expected,
                    }
                })
            }
            K::LengthBetween | K::LengthBetweenInclude => {
                let (low, high) = number_pair(name, operand)?;
                text_len(input).is_some_and(|len| {
                    within(len as f64, low, high, self.kind == K::LengthBetweenInclude)
                })
            }
            K::NotEmpty => !is_blank(input),
            K::IsEmpty => is_blank(input),
            K::RegEx => value_text(input)
                .is_some_and(|text| self.patterns.iter().all(|re| re.is_match(&text))),
            _ => has::evaluate(self.kind, operand, input)?,
        };
        Ok(result)
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

// ─── Operand checks ─────────────────────────────────────────────────────────

/// Validates the operand for `kind`, compiling regex patterns when needed.
fn prepare(kind: BuiltinKind, operand: &Operand) -> Result<Vec<Regex>, ConfigError> {
    use BuiltinKind as K;

    let name = kind.name();
    match kind.shape() {
        OperandShape::FieldKeyed => return has::check_keyed(kind, operand).map(|_| Vec::new()),
        OperandShape::FieldName => return has::check_named(kind, operand).map(|_| Vec::new()),
        OperandShape::Scalar => {}
    }

    match kind {
        K::Between | K::BetweenInclude | K::LengthBetween | K::LengthBetweenInclude => {
            number_pair(name, operand)?;
        }
        K::CountEqual
        | K::CountNotEqual
        | K::CountGreaterThan
        | K::CountGreaterThanEqual
        | K::CountLessThan
        | K::CountLessThanEqual
        | K::GreaterThan
        | K::GreaterThanEqual
        | K::LessThan
        | K::LessThanEqual
        | K::Length
        | K::LengthGt
        | K::LengthGte
        | K::LengthLt
        | K::LengthLte => {
            number_operand(name, operand)?;
        }
        #[cfg(feature = "datetime")]
        K::DateTimeBetween | K::DateTimeBetweenInclude => {
            datetime_pair(name, operand)?;
        }
        K::IsSubnetOf => {
            subnet_operand(name, operand)?;
        }
        K::RegEx => {
            let patterns = operand_values(operand);
            if patterns.is_empty() {
                return Err(ConfigError::operand(name, "a pattern is required"));
            }
            return patterns
                .iter()
                .map(|pattern| {
                    let text = value_text(pattern).unwrap_or_default();
                    compile_pattern(&text)
                        .map_err(|e| ConfigError::operand(name, format!("invalid pattern '{}': {}", text, e)))
                })
                .collect();
        }
        _ => {}
    }
    Ok(Vec::new())
}

/// Scalar operand → one value, list → its items, keyed → its value (or items).
/// A scalar holding an array, as a reference to a list field resolves to,
/// gives the array's items.
pub(crate) fn operand_values(operand: &Operand) -> Vec<Value> {
    match operand {
        Operand::None | Operand::Field(_) => Vec::new(),
        Operand::Scalar(Value::Array(items)) => items.clone(),
        Operand::Scalar(value) => vec![value.clone()],
        Operand::List(items) => items.clone(),
        Operand::Keyed { value, .. } => match value {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        },
    }
}

pub(crate) fn number_operand(name: &str, operand: &Operand) -> Result<f64, ConfigError> {
    let value = match operand {
        Operand::Scalar(value) | Operand::Keyed { value, .. } => value,
        _ => return Err(ConfigError::operand(name, "a single number is required")),
    };
    as_number(value).ok_or_else(|| {
        ConfigError::operand(name, format!("expected a number, got {}", value))
    })
}

fn number_pair(name: &str, operand: &Operand) -> Result<(f64, f64), ConfigError> {
    match operand_values(operand).as_slice() {
        [low, high] => match (as_number(low), as_number(high)) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(ConfigError::operand(name, "both bounds must be numbers")),
        },
        other => Err(ConfigError::operand(
            name,
            format!("exactly two bounds are required, got {}", other.len()),
        )),
    }
}

fn within(n: f64, low: f64, high: f64, inclusive: bool) -> bool {
    if inclusive {
        low <= n && n <= high
    } else {
        low < n && n < high
    }
}

fn matches_ordering(kind: BuiltinKind, ordering: Ordering) -> bool {
    match kind {
        BuiltinKind::GreaterThan | BuiltinKind::HasOneGreaterThan => ordering == Ordering::Greater,
        BuiltinKind::GreaterThanEqual | BuiltinKind::HasOneGreaterThanEqual => {
            ordering != Ordering::Less
        }
        BuiltinKind::LessThan | BuiltinKind::HasOneLessThan => ordering == Ordering::Less,
        _ => ordering != Ordering::Greater,
    }
}

pub(crate) fn ordering_holds(kind: BuiltinKind, value: &Value, threshold: &Value) -> bool {
    compare_numbers(value, threshold).is_some_and(|ordering| matches_ordering(kind, ordering))
}

pub(crate) fn count_of(name: &str, input: &Value) -> Result<usize, ConfigError> {
    match input {
        Value::Array(items) => Ok(items.len()),
        Value::Object(map) => Ok(map.len()),
        other => Err(ConfigError::input(
            name,
            format!("the evaluated input must be a list, got {}", type_name(other)),
        )),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

// ─── Predicates ─────────────────────────────────────────────────────────────

fn accepted(input: &Value) -> bool {
    match input {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

fn declined(input: &Value) -> bool {
    match input {
        Value::Bool(b) => !*b,
        Value::String(s) if matches!(s.to_ascii_lowercase().as_str(), "false" | "no") => true,
        other => as_number(other).is_some_and(|n| n.trunc() == 0.0),
    }
}

fn text_all(input: &Value, predicate: impl Fn(char) -> bool) -> bool {
    match input {
        Value::String(s) => !s.is_empty() && s.chars().all(&predicate),
        Value::Number(_) => value_text(input).is_some_and(|s| s.chars().all(&predicate)),
        _ => false,
    }
}

fn text_pair(input: &Value, operand: &Operand) -> Option<(String, String)> {
    Some((value_text(input)?, value_text(operand.as_scalar()?)?))
}

/// Every operand value occurs in the input.
fn contains_all(input: &Value, operand: &Operand) -> bool {
    let needles = operand_values(operand);
    !needles.is_empty() && needles.iter().all(|needle| contains_value(input, needle))
}

fn contains_any(input: &Value, operand: &Operand) -> bool {
    operand_values(operand)
        .iter()
        .any(|needle| contains_value(input, needle))
}

/// List input: every element is one of the operand values. Scalar input:
/// a member of the operand list, or a substring of a scalar operand.
fn included(input: &Value, operand: &Operand) -> bool {
    let allowed = operand_values(operand);
    match (input, operand) {
        (Value::Array(items), _) => items
            .iter()
            .all(|item| allowed.iter().any(|a| loose_eq(item, a))),
        (_, Operand::Scalar(value)) if !value.is_array() => {
            match (value_text(value), value_text(input)) {
                (Some(haystack), Some(needle)) => haystack.contains(&needle),
                _ => false,
            }
        }
        _ => allowed.iter().any(|a| loose_eq(input, a)),
    }
}

/// List input: no operand value occurs in it. Scalar input: not a member of
/// the operand list, nor a substring of a scalar operand.
fn excluded(input: &Value, operand: &Operand) -> bool {
    let denied = operand_values(operand);
    match (input, operand) {
        (Value::Array(items), _) => !denied
            .iter()
            .any(|d| items.iter().any(|item| loose_eq(item, d))),
        (_, Operand::Scalar(value)) if !value.is_array() => {
            match (value_text(value), value_text(input)) {
                (Some(haystack), Some(needle)) => !haystack.contains(&needle),
                _ => true,
            }
        }
        _ => !denied.iter().any(|d| loose_eq(input, d)),
    }
}

/// Luhn checksum, ignoring spaces and dashes.
fn luhn_valid(text: &str) -> bool {
    let digits: Vec<u32> = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .unwrap_or_default();
    if digits.len() < 2 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// `a.b.c.d/nn`, or a dotted prefix of one to four octets (`192.168.1`).
/// Returns the network and its mask.
fn subnet_operand(name: &str, operand: &Operand) -> Result<(u32, u32), ConfigError> {
    let text = operand
        .as_scalar()
        .and_then(value_text)
        .ok_or_else(|| ConfigError::operand(name, "a subnet is required"))?;
    let invalid = || ConfigError::operand(name, format!("'{}' is not an IPv4 subnet", text));

    if let Some((address, prefix)) = text.split_once('/') {
        let address: Ipv4Addr = address.trim().parse().map_err(|_| invalid())?;
        let prefix: u32 = prefix.trim().parse().map_err(|_| invalid())?;
        if prefix > 32 {
            return Err(invalid());
        }
        let mask = prefix_mask(prefix);
        return Ok((u32::from(address) & mask, mask));
    }

    let octets: Vec<u8> = text
        .trim()
        .trim_end_matches('.')
        .split('.')
        .map(|part| part.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    if octets.is_empty() || octets.len() > 4 {
        return Err(invalid());
    }
    let mut network = [0u8; 4];
    network[..octets.len()].copy_from_slice(&octets);
    let mask = prefix_mask(octets.len() as u32 * 8);
    Ok((u32::from(Ipv4Addr::from(network)), mask))
}

fn prefix_mask(prefix: u32) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

/// Accepts bare patterns and `/pattern/flags` delimited ones.
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(rest) = pattern.strip_prefix('/')
        && let Some(end) = rest.rfind('/')
    {
        let (body, flags) = (&rest[..end], &rest[end + 1..]);
        if flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'x' | 'u')) {
            let flags: String = flags.chars().filter(|c| *c != 'u').collect();
            return if flags.is_empty() {
                Regex::new(body)
            } else {
                Regex::new(&format!("(?{}){}", flags, body))
            };
        }
    }
    Regex::new(pattern)
}

#[cfg(feature = "datetime")]
fn datetime_pair(
    name: &str,
    operand: &Operand,
) -> Result<(chrono::NaiveDateTime, chrono::NaiveDateTime), ConfigError> {
    let values = operand_values(operand);
    let [low, high] = values.as_slice() else {
        return Err(ConfigError::operand(
            name,
            format!("exactly two dates are required, got {}", values.len()),
        ));
    };
    let parse = |value: &Value| {
        value_text(value)
            .and_then(|text| parse_datetime(&text))
            .ok_or_else(|| ConfigError::operand(name, format!("cannot parse {} as a date", value)))
    };
    Ok((parse(low)?, parse(high)?))
}

#[cfg(feature = "datetime")]
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

#[cfg(feature = "datetime")]
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

#[cfg(feature = "datetime")]
fn parse_datetime(text: &str) -> Option<chrono::NaiveDateTime> {
    let text = text.trim();
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(at.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(at) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return Some(at);
        }
    }
    DATE_FORMATS.iter().find_map(|format| {
        chrono::NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

// ─── Messages ───────────────────────────────────────────────────────────────

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::None => String::new(),
        Operand::Scalar(value) => value_text(value).unwrap_or_else(|| value.to_string()),
        Operand::List(items) => items
            .iter()
            .map(|v| value_text(v).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Operand::Keyed { value, .. } => describe(&Operand::from(value.clone())),
        Operand::Field(name) => name.clone(),
    }
}

fn bounds(operand: &Operand) -> (String, String) {
    match operand_values(operand).as_slice() {
        [low, high] => (
            value_text(low).unwrap_or_default(),
            value_text(high).unwrap_or_default(),
        ),
        _ => (String::new(), String::new()),
    }
}

fn default_message(kind: BuiltinKind, operand: &Operand) -> String {
    use BuiltinKind as K;

    let value = describe(operand);
    match kind {
        K::Accepted => "The value must be either 'yes', '1', 1, 'true' or true.".to_string(),
        K::Declined => "The value must be either 'no', '0', 0, 'false' or false.".to_string(),
        K::Alpha => "The value must contain only alphabetic characters.".to_string(),
        K::AlphaNumeric => "The value must contain only alphanumeric characters.".to_string(),
        K::Numeric => "The value must be numeric.".to_string(),
        K::Between => {
            let (low, high) = bounds(operand);
            format!("The value must be between '{}' and '{}'.", low, high)
        }
        K::BetweenInclude => {
            let (low, high) = bounds(operand);
            format!("The value must be between or equal to '{}' and '{}'.", low, high)
        }
        K::Contains => format!("The value must contain '{}'.", value),
        K::NotContains => format!("The value must not contain '{}'.", value),
        K::StartsWith => format!("The value must start with '{}'.", value),
        K::EndsWith => format!("The value must end with '{}'.", value),
        K::CountEqual => format!("The count of the input must be equal to '{}'.", value),
        K::CountNotEqual => format!("The count of the input must not be equal to '{}'.", value),
        K::CountGreaterThan => format!("The count of the input must be greater than '{}'.", value),
        K::CountGreaterThanEqual => format!(
            "The count of the input must be greater than or equal to '{}'.",
            value
        ),
        K::CountLessThan => format!("The count of the input must be less than '{}'.", value),
        K::CountLessThanEqual => {
            format!("The count of the input must be less than or equal to '{}'.", value)
        }
        K::CreditCard => "The value must be a valid credit card number.".to_string(),
        #[cfg(feature = "datetime")]
        K::DateTimeBetween => {
            let (low, high) = bounds(operand);
            format!("The value must be between '{}' and '{}'.", low, high)
        }
        #[cfg(feature = "datetime")]
        K::DateTimeBetweenInclude => {
            let (low, high) = bounds(operand);
            format!("The value must be between or equal to '{}' and '{}'.", low, high)
        }
        K::Email => "The value must be a valid email format.".to_string(),
        K::Equal => format!("The value must be equal to '{}'.", value),
        K::NotEqual => format!("The value must not be equal to '{}'.", value),
        K::GreaterThan => format!("The value must be greater than '{}'.", value),
        K::GreaterThanEqual => format!("The value must be greater than or equal to '{}'.", value),
        K::LessThan => format!("The value must be less than '{}'.", value),
        K::LessThanEqual => format!("The value must be less than or equal to '{}'.", value),
        K::In => format!("The value must be one of '{}'.", value),
        K::NotIn => format!("The value must not be one of '{}'.", value),
        K::Included => "The value must be included.".to_string(),
        K::Excluded => "The value must be excluded.".to_string(),
        K::Ipv4 => "The value must be a valid IPv4 address.".to_string(),
        K::Ipv6 => "The value must be a valid IPv6 address.".to_string(),
        K::IsSubnetOf => format!("The value must be part of the subnet '{}'.", value),
        K::IsJson => "The value must be a valid JSON string.".to_string(),
        K::Length => format!("The value length must be equal to '{}'.", value),
        K::LengthBetween => {
            let (low, high) = bounds(operand);
            format!("The value length must be between '{}' and '{}'.", low, high)
        }
        K::LengthBetweenInclude => {
            let (low, high) = bounds(operand);
            format!(
                "The value length must be between or equal to '{}' and '{}'.",
                low, high
            )
        }
        K::LengthGt => format!("The value length must be greater than '{}'.", value),
        K::LengthGte => format!(
            "The value length must be greater than or equal to '{}'.",
            value
        ),
        K::LengthLt => format!("The value length must be less than '{}'.", value),
        K::LengthLte => format!("The value length must be less than or equal to '{}'.", value),
        K::NotEmpty => "The value must not be empty.".to_string(),
        K::IsEmpty => "The value must be empty.".to_string(),
        K::RegEx => "The value format is not correct.".to_string(),
        _ => has::default_message(kind, operand),
    }
}
