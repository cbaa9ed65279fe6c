//! Traced events definition.
//!
//! Events are the input of the state-history build: a finite sequence of
//! records ordered by non-decreasing timestamp, each carrying an event name,
//! the CPU it was recorded on, and a map of typed payload fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single payload field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Double(f64),
    Str(String),
}

/// One trace event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Nanosecond timestamp.
    pub ts: u64,
    /// Event type name, e.g. `sched_switch`.
    pub name: String,
    /// CPU the event was recorded on. Events without CPU information are
    /// ignored by the kernel analysis.
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

impl PartialOrd for TraceEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for TraceEvent {}

impl Ord for TraceEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ts.cmp(&other.ts)
    }
}

impl TraceEvent {
    /// Integer field accessor. Returns `None` when the field is missing or
    /// not an integer; handlers treat both as "nothing to do".
    pub fn field_i64(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn field_i32(&self, name: &str) -> Option<i32> {
        self.field_i64(name).map(|v| v as i32)
    }

    pub fn field_u32(&self, name: &str) -> Option<u32> {
        self.field_i64(name).and_then(|v| u32::try_from(v).ok())
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn field_f64(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Double(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> TraceEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialization() {
        let ev = event(
            r#"{"ts": 1000, "name": "sched_switch", "cpu": 2,
                "fields": {"prev_tid": 5, "next_comm": "bash", "load": 0.5}}"#,
        );

        assert_eq!(ev.ts, 1000);
        assert_eq!(ev.cpu, Some(2));
        assert_eq!(ev.field_i64("prev_tid"), Some(5));
        assert_eq!(ev.field_str("next_comm"), Some("bash"));
        assert_eq!(ev.field_f64("load"), Some(0.5));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let ev = event(r#"{"ts": 1, "name": "x", "fields": {"comm": "a"}}"#);

        assert_eq!(ev.cpu, None);
        assert_eq!(ev.field_i64("tid"), None);
        assert_eq!(ev.field_i64("comm"), None);
        assert_eq!(ev.field_str("tid"), None);
    }

    #[test]
    fn test_ordering_by_timestamp() {
        let a = event(r#"{"ts": 1, "name": "a"}"#);
        let b = event(r#"{"ts": 2, "name": "b"}"#);

        assert!(a < b);
    }
}
