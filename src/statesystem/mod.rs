//! The state system: attribute tree + interval store + builder façade.
//!
//! A state system tracks the evolution of a tree of attributes over the
//! duration of a trace. Writes are strictly ordered in time and happen on one
//! thread; the result is, per attribute, a gap-free sequence of closed
//! `[start, end] -> value` intervals plus one open-ended "ongoing" value.
//! Point and range queries work both during the build (against the ragged
//! edge) and after `close_history` has sealed the store.

use std::sync::Arc;

pub mod attribute;
pub mod backend;
pub mod error;
pub mod interval;
pub mod progress;
pub mod transient;

use attribute::AttributeTree;
use backend::{InMemoryBackend, NullBackend, StateHistoryBackend};
use error::{Result, StateError};
use interval::{StateInterval, StateValue};
use progress::BuildProgress;
use transient::TransientState;

/// Integer handle for one node of the attribute tree.
pub type Quark = usize;

pub struct StateSystem {
    tree: AttributeTree,
    transient: TransientState,
    backend: Box<dyn StateHistoryBackend + Send>,
    progress: Arc<BuildProgress>,
    finished: bool,
}

impl StateSystem {
    pub fn new(backend: Box<dyn StateHistoryBackend + Send>) -> Self {
        let start = backend.start_time();
        Self {
            tree: AttributeTree::new(),
            transient: TransientState::new(start),
            backend,
            progress: Arc::new(BuildProgress::new(start)),
            finished: false,
        }
    }

    pub fn in_memory(start_time: u64) -> Self {
        Self::new(Box::new(InMemoryBackend::new(start_time)))
    }

    pub fn with_null_backend(start_time: u64) -> Self {
        Self::new(Box::new(NullBackend::new(start_time)))
    }

    /// Handle readers can hold on another thread to follow the build.
    pub fn progress(&self) -> Arc<BuildProgress> {
        Arc::clone(&self.progress)
    }

    fn sync_attributes(&mut self) {
        self.transient
            .ensure_capacity(self.tree.len(), self.backend.start_time());
    }

    /// Quarks only come from this state system's own tree; anything else is
    /// a caller error reported as a missing attribute, never a panic.
    fn check_quark(&self, quark: Quark) -> Result<()> {
        if quark >= self.tree.len() {
            return Err(StateError::AttributeNotFound(format!("quark {}", quark)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute tree access
    // ------------------------------------------------------------------

    /// Resolves an absolute path, creating nodes as needed.
    pub fn get_quark_absolute_and_add(&mut self, path: &[&str]) -> Quark {
        let quark = self.tree.get_or_create(None, path);
        self.sync_attributes();
        quark
    }

    /// Resolves a path relative to `base`, creating nodes as needed.
    pub fn get_quark_relative_and_add(&mut self, base: Quark, path: &[&str]) -> Quark {
        let quark = self.tree.get_or_create(Some(base), path);
        self.sync_attributes();
        quark
    }

    /// Lookup-only absolute path resolution.
    pub fn get_quark_absolute(&self, path: &[&str]) -> Result<Quark> {
        self.tree.get(None, path)
    }

    /// Lookup-only relative path resolution.
    pub fn get_quark_relative(&self, base: Quark, path: &[&str]) -> Result<Quark> {
        self.tree.get(Some(base), path)
    }

    /// Children (or the whole live subtree) of `quark` in creation order;
    /// `None` lists the root attributes.
    pub fn sub_attributes(&self, quark: Option<Quark>, recursive: bool) -> Vec<Quark> {
        self.tree.sub_attributes(quark, recursive)
    }

    pub fn attribute_count(&self) -> usize {
        self.tree.len()
    }

    pub fn attribute_name(&self, quark: Quark) -> &str {
        self.tree.name(quark)
    }

    pub fn full_attribute_path(&self, quark: Quark) -> String {
        self.tree.full_path(quark)
    }

    pub fn parent_quark(&self, quark: Quark) -> Option<Quark> {
        self.tree.parent(quark)
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Records a state change for `quark` at time `t`, closing the previous
    /// ongoing value into the history.
    pub fn modify_attribute(&mut self, t: u64, value: StateValue, quark: Quark) -> Result<()> {
        self.check_quark(quark)?;
        self.transient
            .process_state_change(t, value, quark, self.backend.as_mut())?;
        self.progress.advance(self.transient.latest_time());
        Ok(())
    }

    /// Sets the ongoing value in place, without opening an interval boundary.
    /// Used for metadata corrected after the fact (running min/max), where
    /// the change must not be time-stamped.
    pub fn update_ongoing_state(&mut self, value: StateValue, quark: Quark) -> Result<()> {
        self.check_quark(quark)?;
        self.transient.set_ongoing_value(quark, value);
        Ok(())
    }

    /// The current ongoing value of `quark`; null if never written (or the
    /// quark is unknown, which reads the same as a never-written attribute).
    pub fn query_ongoing_state(&self, quark: Quark) -> StateValue {
        if self.check_quark(quark).is_err() {
            return StateValue::Null;
        }
        self.transient.ongoing_value(quark).clone()
    }

    pub fn ongoing_start_time(&self, quark: Quark) -> Result<u64> {
        self.check_quark(quark)?;
        Ok(self.transient.ongoing_start(quark))
    }

    /// Removes `quark` and its whole subtree as of time `t`: every ongoing
    /// value in the subtree is closed with a null state, then the nodes stop
    /// resolving in lookups. Quark handles stay valid for queries into the
    /// past.
    pub fn remove_attribute(&mut self, t: u64, quark: Quark) -> Result<()> {
        self.check_quark(quark)?;
        let mut subtree = self.tree.sub_attributes(Some(quark), true);
        subtree.push(quark);
        for q in subtree {
            self.transient
                .process_state_change(t, StateValue::Null, q, self.backend.as_mut())?;
        }
        self.tree.mark_removed(quark);
        self.progress.advance(self.transient.latest_time());
        Ok(())
    }

    /// Seals the history: every ongoing value becomes a terminal interval
    /// ending at `end_time` (or at the latest write, if that is later), and
    /// the store becomes read-only.
    pub fn close_history(&mut self, end_time: u64) -> Result<()> {
        self.finish(end_time, false)
    }

    /// Aborts the build mid-stream. Everything closed so far stays
    /// queryable; no rollback happens.
    pub fn cancel_build(&mut self) -> Result<()> {
        let end = self.current_end_time();
        self.finish(end, true)
    }

    fn finish(&mut self, end_time: u64, cancelled: bool) -> Result<()> {
        let end = end_time
            .max(self.backend.end_time())
            .max(self.transient.latest_time());
        self.transient.close(end, self.backend.as_mut())?;
        self.backend.finished_building(end);
        self.finished = true;
        self.progress.finish(end, cancelled);
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ------------------------------------------------------------------
    // Query path
    // ------------------------------------------------------------------

    pub fn start_time(&self) -> u64 {
        self.backend.start_time()
    }

    /// Latest timestamp covered so far (the ragged edge while building, the
    /// final end time once closed).
    pub fn current_end_time(&self) -> u64 {
        self.backend.end_time().max(self.transient.latest_time())
    }

    fn check_bounds(&self, t: u64) -> Result<()> {
        let start = self.start_time();
        let end = self.current_end_time();
        if t < start || t > end {
            return Err(StateError::TimeRange { ts: t, start, end });
        }
        Ok(())
    }

    /// The value in effect at `t` for every attribute, as one interval per
    /// quark, indexed by quark.
    pub fn query_full_state(&self, t: u64) -> Result<Vec<StateInterval>> {
        self.check_bounds(t)?;

        let mut results: Vec<Option<StateInterval>> = vec![None; self.tree.len()];
        self.transient.query_into(&mut results, t);
        self.backend.do_query(&mut results, t);

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(quark, slot)| {
                // Only the null backend leaves holes; report them as null
                // state over the queried instant.
                slot.unwrap_or_else(|| StateInterval::new(self.start_time(), t, quark, StateValue::Null))
            })
            .collect())
    }

    /// The interval covering `t` for one attribute.
    pub fn query_single_state(&self, t: u64, quark: Quark) -> Result<StateInterval> {
        self.check_quark(quark)?;
        self.check_bounds(t)?;
        Ok(self.lookup_interval(t, quark).unwrap_or_else(|| {
            StateInterval::new(self.start_time(), t, quark, StateValue::Null)
        }))
    }

    fn lookup_interval(&self, t: u64, quark: Quark) -> Option<StateInterval> {
        self.transient
            .interval_at(t, quark)
            .or_else(|| self.backend.do_singular_query(t, quark))
    }

    /// Batch query: the covering interval for each requested (quark, time)
    /// combination, lazily, ordered by quark then time, with an interval
    /// covering several requested times yielded once.
    pub fn query_2d(&self, quarks: &[Quark], times: &[u64]) -> Result<Query2D<'_>> {
        for &q in quarks {
            self.check_quark(q)?;
        }
        let mut times: Vec<u64> = times.to_vec();
        times.sort_unstable();
        times.dedup();
        if let (Some(&min), Some(&max)) = (times.first(), times.last()) {
            self.check_bounds(min)?;
            self.check_bounds(max)?;
        }

        Ok(Query2D {
            ss: self,
            quarks: quarks.to_vec(),
            times,
            quark_idx: 0,
            time_idx: 0,
            last_start: None,
        })
    }

    /// Every closed interval of one attribute, oldest first. Ongoing state is
    /// not included; call after `close_history` for the full timeline.
    pub fn intervals_of(&self, quark: Quark) -> Vec<StateInterval> {
        self.backend.intervals_of(quark)
    }
}

/// Lazy iterator produced by [`StateSystem::query_2d`].
pub struct Query2D<'a> {
    ss: &'a StateSystem,
    quarks: Vec<Quark>,
    times: Vec<u64>,
    quark_idx: usize,
    time_idx: usize,
    last_start: Option<u64>,
}

impl Iterator for Query2D<'_> {
    type Item = StateInterval;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let quark = *self.quarks.get(self.quark_idx)?;
            if self.time_idx >= self.times.len() {
                self.quark_idx += 1;
                self.time_idx = 0;
                self.last_start = None;
                continue;
            }
            let t = self.times[self.time_idx];
            self.time_idx += 1;

            if let Some(interval) = self.ss.lookup_interval(t, quark) {
                if self.last_start != Some(interval.start) {
                    self.last_start = Some(interval.start);
                    return Some(interval);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_point_queries() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, "A".into(), q).unwrap();
        ss.modify_attribute(200, "B".into(), q).unwrap();

        assert_eq!(ss.query_ongoing_state(q), StateValue::Str("B".into()));

        let at_150 = ss.query_full_state(150).unwrap();
        assert_eq!(at_150[q].value, StateValue::Str("A".into()));
        let at_200 = ss.query_full_state(200).unwrap();
        assert_eq!(at_200[q].value, StateValue::Str("B".into()));
    }

    #[test]
    fn test_ongoing_and_closed_are_consistent() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, StateValue::Int(1), q).unwrap();
        assert_eq!(ss.query_ongoing_state(q), StateValue::Int(1));

        ss.modify_attribute(300, StateValue::Int(2), q).unwrap();
        assert_eq!(
            ss.query_single_state(100, q).unwrap(),
            StateInterval::new(100, 299, q, StateValue::Int(1))
        );
    }

    #[test]
    fn test_out_of_order_write_fails_cleanly() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, StateValue::Int(1), q).unwrap();
        let err = ss.modify_attribute(50, StateValue::Int(2), q).unwrap_err();

        assert!(matches!(err, StateError::TimeRange { .. }));
        assert_eq!(ss.query_ongoing_state(q), StateValue::Int(1));
        assert_eq!(ss.ongoing_start_time(q).unwrap(), 100);
    }

    #[test]
    fn test_intervals_are_contiguous() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        for (i, t) in [100u64, 250, 400, 1000].iter().enumerate() {
            ss.modify_attribute(*t, StateValue::Int(i as i32), q).unwrap();
        }
        ss.close_history(2000).unwrap();

        let intervals = ss.intervals_of(q);
        assert_eq!(intervals.first().unwrap().start, 0);
        assert_eq!(intervals.last().unwrap().end, 2000);
        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
    }

    #[test]
    fn test_query_bounds() {
        let mut ss = StateSystem::in_memory(100);
        let q = ss.get_quark_absolute_and_add(&["a"]);
        ss.modify_attribute(200, StateValue::Int(1), q).unwrap();

        assert!(ss.query_full_state(50).is_err());
        assert!(ss.query_full_state(201).is_err());
        assert!(ss.query_full_state(200).is_ok());
    }

    #[test]
    fn test_query_2d_round_trip() {
        let mut ss = StateSystem::in_memory(0);
        let a = ss.get_quark_absolute_and_add(&["a"]);
        let b = ss.get_quark_absolute_and_add(&["b"]);

        ss.modify_attribute(100, StateValue::Int(1), a).unwrap();
        ss.modify_attribute(200, StateValue::Int(2), a).unwrap();
        ss.modify_attribute(150, "x".into(), b).unwrap();
        ss.close_history(300).unwrap();

        let out: Vec<StateInterval> =
            ss.query_2d(&[a, b], &[100, 150, 200]).unwrap().collect();

        assert_eq!(
            out,
            vec![
                StateInterval::new(100, 199, a, StateValue::Int(1)),
                StateInterval::new(200, 300, a, StateValue::Int(2)),
                StateInterval::new(0, 149, b, StateValue::Null),
                StateInterval::new(150, 300, b, StateValue::Str("x".into())),
            ]
        );
    }

    #[test]
    fn test_remove_attribute_closes_subtree() {
        let mut ss = StateSystem::in_memory(0);
        let thread = ss.get_quark_absolute_and_add(&["Threads", "9"]);
        let status = ss.get_quark_relative_and_add(thread, &["Status"]);

        ss.modify_attribute(10, StateValue::Int(5), status).unwrap();
        ss.remove_attribute(500, thread).unwrap();
        ss.close_history(600).unwrap();

        // History before the removal is still there.
        let at_499 = ss.query_full_state(499).unwrap();
        assert_eq!(at_499[status].value, StateValue::Int(5));
        // The subtree no longer resolves.
        assert!(ss.get_quark_absolute(&["Threads", "9"]).is_err());
        assert_eq!(
            ss.query_full_state(600).unwrap()[status].value,
            StateValue::Null
        );
    }

    #[test]
    fn test_update_ongoing_state_keeps_boundary() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["freq"]);

        ss.modify_attribute(100, StateValue::Long(1_000_000), q).unwrap();
        ss.update_ongoing_state(StateValue::Long(800_000), q).unwrap();
        ss.close_history(500).unwrap();

        assert_eq!(
            ss.intervals_of(q).last(),
            Some(&StateInterval::new(100, 500, q, StateValue::Long(800_000)))
        );
    }

    #[test]
    fn test_ongoing_state_survives_close() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, StateValue::Int(7), q).unwrap();
        ss.close_history(500).unwrap();

        // The sealed history still reports the final value both ways.
        assert_eq!(ss.query_ongoing_state(q), StateValue::Int(7));
        assert_eq!(
            ss.query_single_state(500, q).unwrap().value,
            StateValue::Int(7)
        );
    }

    #[test]
    fn test_cancel_keeps_partial_results() {
        let mut ss = StateSystem::in_memory(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, StateValue::Int(1), q).unwrap();
        ss.modify_attribute(300, StateValue::Int(2), q).unwrap();
        ss.cancel_build().unwrap();

        assert!(ss.is_finished());
        assert!(ss.progress().is_cancelled());
        assert_eq!(
            ss.query_single_state(150, q).unwrap().value,
            StateValue::Int(1)
        );
        assert!(ss.modify_attribute(400, StateValue::Int(3), q).is_err());
    }

    #[test]
    fn test_unknown_quark_is_rejected() {
        let mut ss = StateSystem::in_memory(0);
        let bogus = 42;

        assert!(matches!(
            ss.modify_attribute(10, StateValue::Int(1), bogus),
            Err(StateError::AttributeNotFound(_))
        ));
        assert!(ss.update_ongoing_state(StateValue::Int(1), bogus).is_err());
        assert!(ss.ongoing_start_time(bogus).is_err());
        assert!(ss.remove_attribute(10, bogus).is_err());
        assert!(ss.query_single_state(0, bogus).is_err());
        // Reads like an attribute that was never written.
        assert_eq!(ss.query_ongoing_state(bogus), StateValue::Null);
    }

    #[test]
    fn test_null_backend_write_path() {
        let mut ss = StateSystem::with_null_backend(0);
        let q = ss.get_quark_absolute_and_add(&["a"]);

        ss.modify_attribute(100, StateValue::Int(1), q).unwrap();
        assert!(ss.modify_attribute(50, StateValue::Int(2), q).is_err());
        assert_eq!(ss.query_ongoing_state(q), StateValue::Int(1));

        ss.close_history(200).unwrap();
        // Closed history was discarded; queries degrade to null placeholders.
        assert_eq!(ss.query_single_state(80, q).unwrap().value, StateValue::Null);
    }
}
