//! Linux kernel analysis: builds the process/CPU state tree from a kernel
//! trace.
//!
//! The analysis owns a [`StateSystem`] and a dispatch table mapping event
//! names to [`Handler`]s, both fixed at construction. Events flow through
//! [`KernelAnalysis::consume_event`] in trace order; a handler error spoils
//! that one event only, never the build.

use std::collections::HashMap;

use serde::Serialize;

use crate::events::TraceEvent;
use crate::statesystem::StateSystem;
use crate::EventProcessor;

pub mod attributes;
pub mod handlers;
pub mod layout;
pub mod values;

use handlers::{syscall, Handler};
use layout::EventLayout;

/// Build counters reported at finalization.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnalysisStats {
    /// Events a handler consumed.
    pub processed: u64,
    /// Events with no matching handler.
    pub skipped: u64,
    /// Events whose handler returned an error.
    pub errors: u64,
}

pub struct KernelAnalysis {
    ss: StateSystem,
    layout: EventLayout,
    dispatch: HashMap<String, Handler>,
    verbose: bool,
    last_ts: u64,
    stats: AnalysisStats,
}

fn build_dispatch(layout: &EventLayout) -> HashMap<String, Handler> {
    let mut map = HashMap::new();
    map.insert(layout.cpu_frequency.clone(), Handler::CpuFrequency);
    map.insert(layout.irq_handler_entry.clone(), Handler::IrqEntry);
    map.insert(layout.irq_handler_exit.clone(), Handler::IrqExit);
    map.insert(layout.ipi_entry.clone(), Handler::IpiEntry);
    map.insert(layout.ipi_exit.clone(), Handler::IpiExit);
    map.insert(layout.softirq_entry.clone(), Handler::SoftIrqEntry);
    map.insert(layout.softirq_exit.clone(), Handler::SoftIrqExit);
    map.insert(layout.softirq_raise.clone(), Handler::SoftIrqRaise);
    map.insert(layout.sched_switch.clone(), Handler::SchedSwitch);
    for name in &layout.sched_wakeup {
        map.insert(name.clone(), Handler::SchedWakeup);
    }
    map.insert(layout.sched_migrate_task.clone(), Handler::SchedMigrateTask);
    map.insert(layout.sched_pi_setprio.clone(), Handler::SchedPiSetprio);
    map.insert(layout.sched_process_fork.clone(), Handler::ProcessFork);
    map.insert(layout.sched_process_exit.clone(), Handler::ProcessExit);
    map.insert(layout.sched_process_free.clone(), Handler::ProcessFree);
    map.insert(layout.statedump_process_state.clone(), Handler::StateDump);
    map
}

impl KernelAnalysis {
    pub fn new(ss: StateSystem, layout: EventLayout, verbose: bool) -> Self {
        let dispatch = build_dispatch(&layout);
        let last_ts = ss.start_time();
        Self {
            ss,
            layout,
            dispatch,
            verbose,
            last_ts,
            stats: AnalysisStats::default(),
        }
    }

    pub fn state_system(&self) -> &StateSystem {
        &self.ss
    }

    pub fn into_state_system(self) -> StateSystem {
        self.ss
    }

    pub fn stats(&self) -> AnalysisStats {
        self.stats
    }
}

impl EventProcessor for KernelAnalysis {
    fn consume_event(&mut self, event: &TraceEvent) {
        let result = if let Some(handler) = self.dispatch.get(&event.name).copied() {
            handler.handle(&mut self.ss, event, &self.layout)
        } else if self.layout.is_syscall_entry(&event.name) {
            syscall::entry(&mut self.ss, event)
        } else if self.layout.is_syscall_exit(&event.name) {
            syscall::exit(&mut self.ss, event)
        } else {
            self.stats.skipped += 1;
            return;
        };

        self.last_ts = self.last_ts.max(event.ts);
        match result {
            Ok(()) => self.stats.processed += 1,
            Err(e) => {
                self.stats.errors += 1;
                if self.verbose {
                    eprintln!("{} event at t={} dropped: {}", event.name, event.ts, e);
                }
            }
        }
    }

    fn finalize(&mut self) {
        if let Err(e) = self.ss.close_history(self.last_ts) {
            if self.verbose {
                eprintln!("Error closing the state history: {}", e);
            }
        }
    }
}
