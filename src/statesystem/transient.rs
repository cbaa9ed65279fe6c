//! The transient state: ongoing values being built into intervals.
//!
//! For every attribute we keep the pair `(start, value)` of its current,
//! open-ended state. When a state change arrives at a later timestamp, the
//! pair is closed into a permanent `[start, t-1]` interval in the backend and
//! a new pair is opened at `t`. This pairing of a mutable ongoing cache with
//! the append-only closed log is the crux of the incremental-update
//! algorithm.

use super::backend::StateHistoryBackend;
use super::error::{Result, StateError};
use super::interval::{StateInterval, StateValue, ValueKind};
use super::Quark;

struct Ongoing {
    value: StateValue,
    start: u64,
}

pub struct TransientState {
    active: bool,
    latest_time: u64,
    ongoing: Vec<Ongoing>,
    /// Kind of the first non-null value seen per attribute.
    kinds: Vec<Option<ValueKind>>,
}

impl TransientState {
    pub fn new(start_time: u64) -> Self {
        Self {
            active: true,
            latest_time: start_time,
            ongoing: Vec::new(),
            kinds: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn latest_time(&self) -> u64 {
        self.latest_time
    }

    pub fn len(&self) -> usize {
        self.ongoing.len()
    }

    /// Grows the ongoing tables to match the attribute tree. A new attribute
    /// is considered to have been in the null state since the start of the
    /// history, so that its timeline has no holes.
    pub fn ensure_capacity(&mut self, n: usize, start_time: u64) {
        while self.ongoing.len() < n {
            self.ongoing.push(Ongoing {
                value: StateValue::Null,
                start: start_time,
            });
            self.kinds.push(None);
        }
    }

    pub fn ongoing_value(&self, quark: Quark) -> &StateValue {
        &self.ongoing[quark].value
    }

    pub fn ongoing_start(&self, quark: Quark) -> u64 {
        self.ongoing[quark].start
    }

    /// Replaces the ongoing value without moving its start time. The most
    /// recently opened interval keeps its boundary; only its eventual value
    /// changes.
    pub fn set_ongoing_value(&mut self, quark: Quark, value: StateValue) {
        self.ongoing[quark].value = value;
    }

    /// The ongoing state as a pseudo-interval whose end is the latest time
    /// seen so far. `None` if `t` predates the current state or the transient
    /// state is closed.
    pub fn interval_at(&self, t: u64, quark: Quark) -> Option<StateInterval> {
        if !self.active || t < self.ongoing[quark].start {
            return None;
        }
        Some(StateInterval::new(
            self.ongoing[quark].start,
            self.latest_time,
            quark,
            self.ongoing[quark].value.clone(),
        ))
    }

    /// Processes one state change.
    ///
    /// Writing the value already in place keeps the current interval running.
    /// Writing at the exact start of the ongoing state overwrites it in place
    /// rather than producing a zero-length interval. Writing strictly before
    /// the ongoing start is an out-of-order input and fails without touching
    /// the store.
    pub fn process_state_change(
        &mut self,
        t: u64,
        value: StateValue,
        quark: Quark,
        backend: &mut dyn StateHistoryBackend,
    ) -> Result<()> {
        if !self.active {
            return Err(StateError::Finalized);
        }

        match (self.kinds[quark], value.kind()) {
            (None, Some(kind)) => self.kinds[quark] = Some(kind),
            (Some(expected), Some(kind)) if kind != expected => {
                return Err(StateError::ValueType {
                    quark,
                    got: kind.name(),
                    expected: expected.name(),
                });
            }
            _ => {}
        }

        if self.ongoing[quark].value == value {
            return Ok(());
        }

        let start = self.ongoing[quark].start;
        if t < start {
            return Err(StateError::TimeRange {
                ts: t,
                start,
                end: self.latest_time,
            });
        }

        if start < t {
            let previous = std::mem::take(&mut self.ongoing[quark].value);
            backend.insert_past_state(start, t - 1, quark, previous)?;
            self.ongoing[quark].start = t;
        }
        self.ongoing[quark].value = value;

        if self.latest_time < t {
            self.latest_time = t;
        }
        Ok(())
    }

    /// Fills `results` with pseudo-intervals for every attribute whose
    /// ongoing state covers `t`.
    pub fn query_into(&self, results: &mut [Option<StateInterval>], t: u64) {
        if !self.active {
            return;
        }
        for (quark, slot) in results.iter_mut().enumerate() {
            if let Some(interval) = self.interval_at(t, quark) {
                *slot = Some(interval);
            }
        }
    }

    /// Flushes every still-ongoing value as a terminal interval ending at
    /// `end_time` and deactivates the transient state. The ongoing values
    /// themselves are kept: "what was the final state" stays answerable
    /// without a backend query.
    pub fn close(&mut self, end_time: u64, backend: &mut dyn StateHistoryBackend) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        for quark in 0..self.ongoing.len() {
            let start = self.ongoing[quark].start;
            if start > end_time {
                continue;
            }
            let value = self.ongoing[quark].value.clone();
            backend.insert_past_state(start, end_time, quark, value)?;
        }
        self.active = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statesystem::backend::InMemoryBackend;

    fn setup(n: usize) -> (TransientState, InMemoryBackend) {
        let mut trans = TransientState::new(0);
        trans.ensure_capacity(n, 0);
        (trans, InMemoryBackend::new(0))
    }

    #[test]
    fn test_state_change_closes_previous_interval() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        trans
            .process_state_change(200, StateValue::Int(2), 0, &mut backend)
            .unwrap();

        // Initial null state closed at 99, first value closed at 199.
        assert_eq!(
            backend.intervals_of(0),
            vec![
                StateInterval::new(0, 99, 0, StateValue::Null),
                StateInterval::new(100, 199, 0, StateValue::Int(1)),
            ]
        );
        assert_eq!(trans.ongoing_value(0), &StateValue::Int(2));
        assert_eq!(trans.ongoing_start(0), 200);
    }

    #[test]
    fn test_same_value_keeps_interval_running() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        trans
            .process_state_change(200, StateValue::Int(1), 0, &mut backend)
            .unwrap();

        assert_eq!(backend.intervals_of(0).len(), 1);
        assert_eq!(trans.ongoing_start(0), 100);
    }

    #[test]
    fn test_same_timestamp_overwrites_in_place() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        trans
            .process_state_change(100, StateValue::Int(2), 0, &mut backend)
            .unwrap();

        assert_eq!(trans.ongoing_value(0), &StateValue::Int(2));
        assert_eq!(trans.ongoing_start(0), 100);
        // No zero-length interval was produced.
        assert_eq!(backend.intervals_of(0).len(), 1);
    }

    #[test]
    fn test_out_of_order_write_rejected_without_side_effects() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        let before = backend.intervals_of(0);

        let err = trans
            .process_state_change(50, StateValue::Int(9), 0, &mut backend)
            .unwrap_err();

        assert!(matches!(err, StateError::TimeRange { ts: 50, .. }));
        assert_eq!(backend.intervals_of(0), before);
        assert_eq!(trans.ongoing_value(0), &StateValue::Int(1));
        assert_eq!(trans.ongoing_start(0), 100);
    }

    #[test]
    fn test_value_kind_is_sticky() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        let err = trans
            .process_state_change(200, StateValue::Str("x".into()), 0, &mut backend)
            .unwrap_err();

        assert!(matches!(err, StateError::ValueType { .. }));

        // Null stays acceptable for any attribute.
        trans
            .process_state_change(200, StateValue::Null, 0, &mut backend)
            .unwrap();
    }

    #[test]
    fn test_update_ongoing_keeps_start() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Long(5), 0, &mut backend)
            .unwrap();
        trans.set_ongoing_value(0, StateValue::Long(3));

        assert_eq!(trans.ongoing_start(0), 100);
        assert_eq!(trans.ongoing_value(0), &StateValue::Long(3));
    }

    #[test]
    fn test_close_flushes_everything() {
        let (mut trans, mut backend) = setup(2);

        trans
            .process_state_change(100, StateValue::Int(1), 0, &mut backend)
            .unwrap();
        trans.close(500, &mut backend).unwrap();

        assert_eq!(
            backend.intervals_of(0).last(),
            Some(&StateInterval::new(100, 500, 0, StateValue::Int(1)))
        );
        // Never-written attribute gets one null interval spanning the run.
        assert_eq!(
            backend.intervals_of(1),
            vec![StateInterval::new(0, 500, 1, StateValue::Null)]
        );
        assert!(!trans.is_active());

        let err = trans
            .process_state_change(600, StateValue::Int(2), 0, &mut backend)
            .unwrap_err();
        assert_eq!(err, StateError::Finalized);
    }

    #[test]
    fn test_close_preserves_ongoing_values() {
        let (mut trans, mut backend) = setup(1);

        trans
            .process_state_change(100, StateValue::Int(7), 0, &mut backend)
            .unwrap();
        trans.close(500, &mut backend).unwrap();

        // Flushing the terminal interval must not wipe the value itself.
        assert_eq!(trans.ongoing_value(0), &StateValue::Int(7));
    }
}
