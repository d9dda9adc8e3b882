//! Path resolution and the loose value comparisons shared by the engine and
//! the built-in capabilities.

use serde_json::Value;
use std::cmp::Ordering;

// ─── resolve_path ───────────────────────────────────────────────────────────

/// Collects every value addressed by a dotted path in a tree of maps and lists.
///
/// Named keys extend the current path (`a` → `a.b`); list positions do not,
/// so `users.email` matches the `email` of every element of `users`, in list
/// order. Object keys made only of digits count as list positions. A matched
/// node is collected whole and its siblings are still visited. An empty
/// target matches nothing.
pub fn resolve_path(target: &str, data: &Value) -> Vec<Value> {
    let mut matches = Vec::new();
    if !target.is_empty() {
        walk(target, data, None, &mut matches);
    }
    matches
}

fn walk(target: &str, node: &Value, current: Option<&str>, matches: &mut Vec<Value>) {
    if current == Some(target) {
        matches.push(node.clone());
        return;
    }

    match node {
        Value::Object(map) => {
            for (key, child) in map {
                if is_index_key(key) {
                    walk(target, child, current, matches);
                    continue;
                }
                let path = match current {
                    Some(parent) => format!("{}.{}", parent, key),
                    None => key.clone(),
                };
                if is_path_prefix(&path, target) {
                    walk(target, child, Some(&path), matches);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(target, item, current, matches);
            }
        }
        _ => {}
    }
}

fn is_index_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// `path` is `target` or one of its dotted ancestors.
fn is_path_prefix(path: &str, target: &str) -> bool {
    match target.strip_prefix(path) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// A field name containing `.` is a path into nested data.
pub fn is_dotted(field: &str) -> bool {
    field.contains('.')
}

/// Values addressed by `field`: the top-level entry for a simple name, every
/// match for a dotted path.
pub fn lookup_field(record: &Value, field: &str) -> Vec<Value> {
    if is_dotted(field) {
        resolve_path(field, record)
    } else {
        record.get(field).cloned().into_iter().collect()
    }
}

/// Like [`lookup_field`], with matched lists flattened into their elements
/// and nulls dropped.
pub fn field_items(record: &Value, field: &str) -> Vec<Value> {
    let mut items = Vec::new();
    for value in lookup_field(record, field) {
        match value {
            Value::Array(elements) => items.extend(elements.into_iter().filter(|e| !e.is_null())),
            Value::Null => {}
            other => items.push(other),
        }
    }
    items
}

// ─── Loose comparison ───────────────────────────────────────────────────────

/// Numeric view of a value: numbers, and strings that spell a decimal number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty()
        || !s.bytes().any(|b| b.is_ascii_digit())
        || !s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Form-style truthiness: `null`, `false`, `0`, `""`, `"0"` and empty
/// collections are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// `null`, the empty string and empty collections. Zero is not blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Loose equality as form input needs it: `"1"` equals `1`, `true` equals
/// any truthy value, `""` equals `null`. Collections compare element-wise.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => match (value_text(a), value_text(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
    }
}

/// Numeric ordering of two values, `None` unless both are numeric.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    as_number(a)?.partial_cmp(&as_number(b)?)
}

/// Text view of a scalar; `None` for null and collections.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Character length of a scalar's text form.
pub fn text_len(value: &Value) -> Option<usize> {
    value_text(value).map(|s| s.chars().count())
}

/// `needle` occurs in `haystack`: substring for text, membership for lists.
pub fn contains_value(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::Object(map) => map.values().any(|item| loose_eq(item, needle)),
        other => match (value_text(other), value_text(needle)) {
            (Some(h), Some(n)) => h.contains(&n),
            _ => false,
        },
    }
}
