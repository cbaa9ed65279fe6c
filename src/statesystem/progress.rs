//! Build progress synchronization.
//!
//! The writer is single-threaded, but readers (live views, statistics
//! consumers) may poll an in-progress build from other threads. They hold a
//! `BuildProgress` handle and block until the builder has advanced past the
//! timestamp they want to query, or until the whole history is finalized.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct ProgressState {
    end_time: u64,
    finished: bool,
    cancelled: bool,
}

#[derive(Default)]
pub struct BuildProgress {
    state: Mutex<ProgressState>,
    cond: Condvar,
}

impl BuildProgress {
    pub fn new(start_time: u64) -> Self {
        Self {
            state: Mutex::new(ProgressState {
                end_time: start_time,
                finished: false,
                cancelled: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Latest timestamp the builder has processed.
    pub fn current_end_time(&self) -> u64 {
        self.state.lock().unwrap().end_time
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().unwrap().cancelled
    }

    pub(super) fn advance(&self, t: u64) {
        let mut state = self.state.lock().unwrap();
        if t > state.end_time {
            state.end_time = t;
            self.cond.notify_all();
        }
    }

    pub(super) fn finish(&self, end_time: u64, cancelled: bool) {
        let mut state = self.state.lock().unwrap();
        if end_time > state.end_time {
            state.end_time = end_time;
        }
        state.finished = true;
        state.cancelled = cancelled;
        self.cond.notify_all();
    }

    /// Blocks until the builder has advanced past `t` or the build has
    /// finished. Returns the end time observed when waking up.
    pub fn wait_until_past(&self, t: u64) -> u64 {
        let mut state = self.state.lock().unwrap();
        while state.end_time < t && !state.finished {
            state = self.cond.wait(state).unwrap();
        }
        state.end_time
    }

    /// Blocks until the whole history is built (or the build cancelled).
    pub fn wait_until_built(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        while !state.finished {
            state = self.cond.wait(state).unwrap();
        }
        state.end_time
    }
}
