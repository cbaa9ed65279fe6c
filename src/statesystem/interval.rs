//! State values and state intervals.
//!
//! A `StateValue` is the payload an attribute holds at a point in time. A
//! `StateInterval` is a closed `[start, end]` timestamp range during which one
//! attribute held one value. For a given attribute, intervals are contiguous
//! and non-overlapping: the end of one is start-1 of the next.

use serde::{Deserialize, Serialize};

use super::error::StateError;
use super::Quark;

/// The kinds a non-null state value can take. The first non-null write to an
/// attribute fixes its kind for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Long,
    Double,
    Str,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Str => "string",
        }
    }
}

/// Value held by one attribute over one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum StateValue {
    #[default]
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
}

impl StateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            StateValue::Null => None,
            StateValue::Int(_) => Some(ValueKind::Int),
            StateValue::Long(_) => Some(ValueKind::Long),
            StateValue::Double(_) => Some(ValueKind::Double),
            StateValue::Str(_) => Some(ValueKind::Str),
        }
    }

    fn type_error(&self, quark: Quark, expected: &'static str) -> StateError {
        StateError::ValueType {
            quark,
            got: self.kind().map(|k| k.name()).unwrap_or("null"),
            expected,
        }
    }

    /// Unboxes an integer value. A null value unboxes to `default`, which is
    /// how handlers probe attributes that may not have been written yet.
    pub fn int_or(&self, default: i32, quark: Quark) -> Result<i32, StateError> {
        match self {
            StateValue::Null => Ok(default),
            StateValue::Int(v) => Ok(*v),
            other => Err(other.type_error(quark, "int")),
        }
    }

    /// Unboxes a long value, with the same null behaviour as [`int_or`].
    ///
    /// [`int_or`]: StateValue::int_or
    pub fn long_or(&self, default: i64, quark: Quark) -> Result<i64, StateError> {
        match self {
            StateValue::Null => Ok(default),
            StateValue::Long(v) => Ok(*v),
            StateValue::Int(v) => Ok(*v as i64),
            other => Err(other.type_error(quark, "long")),
        }
    }

    pub fn str_or<'a>(&'a self, default: &'a str, quark: Quark) -> Result<&'a str, StateError> {
        match self {
            StateValue::Null => Ok(default),
            StateValue::Str(s) => Ok(s.as_str()),
            other => Err(other.type_error(quark, "string")),
        }
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        StateValue::Int(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Long(v)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Double(v)
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Str(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Str(v.to_string())
    }
}

/// A closed time interval with one value, for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInterval {
    pub start: u64,
    pub end: u64,
    pub quark: Quark,
    pub value: StateValue,
}

impl StateInterval {
    pub fn new(start: u64, end: u64, quark: Quark, value: StateValue) -> Self {
        Self {
            start,
            end,
            quark,
            value,
        }
    }

    /// Returns true if `t` falls inside this interval.
    pub fn intersects(&self, t: u64) -> bool {
        self.start <= t && t <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unboxing() {
        assert_eq!(StateValue::Int(3).int_or(-1, 0), Ok(3));
        assert_eq!(StateValue::Null.int_or(-1, 0), Ok(-1));
        assert_eq!(StateValue::Int(3).long_or(0, 0), Ok(3));
        assert_eq!(StateValue::Long(1 << 40).long_or(0, 0), Ok(1 << 40));
        assert_eq!(StateValue::Str("a".into()).str_or("", 0), Ok("a"));

        assert!(StateValue::Str("a".into()).int_or(-1, 7).is_err());
        assert!(StateValue::Int(1).str_or("", 7).is_err());
    }

    #[test]
    fn test_intersects() {
        let iv = StateInterval::new(10, 20, 0, StateValue::Null);

        assert!(iv.intersects(10));
        assert!(iv.intersects(20));
        assert!(!iv.intersects(9));
        assert!(!iv.intersects(21));
    }
}
