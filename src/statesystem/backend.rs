//! State history storage backends.
//!
//! The transient state closes intervals into a backend as state changes come
//! in. The backend is a capability chosen at construction time: an in-memory
//! store for normal use, or a null store that discards everything when only
//! the write path is being exercised (benchmarking). A disk-backed store
//! would slot in behind the same trait.

use super::error::{Result, StateError};
use super::interval::{StateInterval, StateValue};
use super::Quark;

pub trait StateHistoryBackend {
    /// Start of the time range covered by this history.
    fn start_time(&self) -> u64;

    /// End of the closed portion of the history: the latest interval end
    /// inserted so far.
    fn end_time(&self) -> u64;

    /// Inserts a closed interval. Interval starts are non-decreasing per
    /// attribute; the caller (the transient state) guarantees it.
    fn insert_past_state(
        &mut self,
        start: u64,
        end: u64,
        quark: Quark,
        value: StateValue,
    ) -> Result<()>;

    /// Fills `results` with the interval in effect at `t` for every attribute
    /// that has closed history there. Slots already filled are left alone.
    fn do_query(&self, results: &mut [Option<StateInterval>], t: u64);

    /// The interval of one attribute covering `t`, if it is in the closed
    /// history.
    fn do_singular_query(&self, t: u64, quark: Quark) -> Option<StateInterval>;

    /// All closed intervals of one attribute, in time order.
    fn intervals_of(&self, quark: Quark) -> Vec<StateInterval>;

    /// Called once, after the last ongoing state has been flushed.
    fn finished_building(&mut self, end_time: u64);
}

/// Keeps every interval in memory, one sorted run per attribute.
pub struct InMemoryBackend {
    start_time: u64,
    end_time: u64,
    intervals: Vec<Vec<StateInterval>>,
}

impl InMemoryBackend {
    pub fn new(start_time: u64) -> Self {
        Self {
            start_time,
            end_time: start_time,
            intervals: Vec::new(),
        }
    }

    fn find(&self, t: u64, quark: Quark) -> Option<&StateInterval> {
        let run = self.intervals.get(quark)?;
        // Runs are sorted by start time; the covering interval is the last
        // one starting at or before t.
        let idx = run.partition_point(|iv| iv.start <= t).checked_sub(1)?;
        let candidate = &run[idx];
        candidate.intersects(t).then_some(candidate)
    }
}

impl StateHistoryBackend for InMemoryBackend {
    fn start_time(&self) -> u64 {
        self.start_time
    }

    fn end_time(&self) -> u64 {
        self.end_time
    }

    fn insert_past_state(
        &mut self,
        start: u64,
        end: u64,
        quark: Quark,
        value: StateValue,
    ) -> Result<()> {
        if start < self.start_time || end < start {
            return Err(StateError::TimeRange {
                ts: start,
                start: self.start_time,
                end: self.end_time,
            });
        }

        if self.intervals.len() <= quark {
            self.intervals.resize_with(quark + 1, Vec::new);
        }
        self.intervals[quark].push(StateInterval::new(start, end, quark, value));

        if end > self.end_time {
            self.end_time = end;
        }
        Ok(())
    }

    fn do_query(&self, results: &mut [Option<StateInterval>], t: u64) {
        for (quark, slot) in results.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = self.find(t, quark).cloned();
            }
        }
    }

    fn do_singular_query(&self, t: u64, quark: Quark) -> Option<StateInterval> {
        self.find(t, quark).cloned()
    }

    fn intervals_of(&self, quark: Quark) -> Vec<StateInterval> {
        self.intervals.get(quark).cloned().unwrap_or_default()
    }

    fn finished_building(&mut self, end_time: u64) {
        if end_time > self.end_time {
            self.end_time = end_time;
        }
    }
}

/// Discards every interval. The write path (ongoing values, monotonicity
/// checks) behaves normally, but queries into the closed history come back
/// empty. Only useful to benchmark the build itself.
pub struct NullBackend {
    start_time: u64,
    end_time: u64,
}

impl NullBackend {
    pub fn new(start_time: u64) -> Self {
        Self {
            start_time,
            end_time: start_time,
        }
    }
}

impl StateHistoryBackend for NullBackend {
    fn start_time(&self) -> u64 {
        self.start_time
    }

    fn end_time(&self) -> u64 {
        self.end_time
    }

    fn insert_past_state(
        &mut self,
        start: u64,
        end: u64,
        _quark: Quark,
        _value: StateValue,
    ) -> Result<()> {
        if start < self.start_time || end < start {
            return Err(StateError::TimeRange {
                ts: start,
                start: self.start_time,
                end: self.end_time,
            });
        }
        if end > self.end_time {
            self.end_time = end;
        }
        Ok(())
    }

    fn do_query(&self, _results: &mut [Option<StateInterval>], _t: u64) {}

    fn do_singular_query(&self, _t: u64, _quark: Quark) -> Option<StateInterval> {
        None
    }

    fn intervals_of(&self, _quark: Quark) -> Vec<StateInterval> {
        Vec::new()
    }

    fn finished_building(&mut self, end_time: u64) {
        if end_time > self.end_time {
            self.end_time = end_time;
        }
    }
}
