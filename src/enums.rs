//! Closed enumerations used by the engine.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How many conditions and how many validations must pass.
///
/// Conditions and validations are judged independently: "strict" for either
/// means all must pass, otherwise at least one must.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrictMode {
    None,
    ValidationsOnly,
    ConditionsOnly,
    #[default]
    Both,
}

impl StrictMode {
    /// Maps the numeric levels `0..=3` used by older configurations.
    pub fn from_level(level: i64) -> Result<Self, ConfigError> {
        match level {
            0 => Ok(StrictMode::None),
            1 => Ok(StrictMode::ValidationsOnly),
            2 => Ok(StrictMode::ConditionsOnly),
            3 => Ok(StrictMode::Both),
            other => Err(ConfigError::InvalidStrictLevel(other)),
        }
    }

    pub fn level(self) -> u8 {
        match self {
            StrictMode::None => 0,
            StrictMode::ValidationsOnly => 1,
            StrictMode::ConditionsOnly => 2,
            StrictMode::Both => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrictMode::None => "none",
            StrictMode::ValidationsOnly => "validations_only",
            StrictMode::ConditionsOnly => "conditions_only",
            StrictMode::Both => "both",
        }
    }

    /// All validations must pass.
    pub fn validations_strict(self) -> bool {
        matches!(self, StrictMode::Both | StrictMode::ValidationsOnly)
    }

    /// All conditions must pass.
    pub fn conditions_strict(self) -> bool {
        matches!(self, StrictMode::Both | StrictMode::ConditionsOnly)
    }
}

impl fmt::Display for StrictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StrictMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts either the snake_case name or the numeric level.
impl<'de> Deserialize<'de> for StrictMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) => match s.as_str() {
                "none" => Ok(StrictMode::None),
                "validations_only" => Ok(StrictMode::ValidationsOnly),
                "conditions_only" => Ok(StrictMode::ConditionsOnly),
                "both" => Ok(StrictMode::Both),
                other => Err(serde::de::Error::unknown_variant(
                    other,
                    &["none", "validations_only", "conditions_only", "both"],
                )),
            },
            serde_json::Value::Number(n) => {
                let level = n.as_i64().ok_or_else(|| {
                    serde::de::Error::custom(format!("strict level must be an integer, got {}", n))
                })?;
                StrictMode::from_level(level).map_err(serde::de::Error::custom)
            }
            _ => Err(serde::de::Error::custom(
                "strict must be a string or an integer level",
            )),
        }
    }
}

/// Aggregate outcome of a group of boolean checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    None,
    All,
    Some,
}

impl PassStatus {
    /// ALL when every check passed (including when there were none), NONE
    /// when no check passed, SOME otherwise.
    pub fn from_counts(total: usize, passed: usize) -> Self {
        if total == passed {
            PassStatus::All
        } else if passed > 0 {
            PassStatus::Some
        } else {
            PassStatus::None
        }
    }

    pub fn any_passed(self) -> bool {
        !matches!(self, PassStatus::None)
    }
}

/// How a capability's operand is derived from a rule.
///
/// This is a static property of the capability name, never inferred from
/// the rule's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandShape {
    /// The rule value as-is: a scalar, or a list when comma-separated.
    Scalar,
    /// `{field: value}`. The capability inspects a named field of the record.
    FieldKeyed,
    /// The field name itself; any parsed value is discarded.
    FieldName,
}

impl OperandShape {
    /// Field-addressed capabilities resolve their field themselves and are
    /// always run against the whole record.
    pub fn addresses_field(self) -> bool {
        !matches!(self, OperandShape::Scalar)
    }
}
