//! Kernel event handlers.
//!
//! Each handler implements exactly one state-transition rule, triggered by
//! one event name. Handlers are pure functions of (current state, event):
//! they read prior ongoing values, compute new values and write them back
//! through the state system. There is no cross-event buffering and no
//! handler-to-handler communication outside the shared state tree.

use crate::events::TraceEvent;
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::{Quark, StateSystem};

use super::attributes;
use super::layout::EventLayout;
use super::values::{CpuStatus, ProcessStatus};

pub mod frequency;
pub mod irq;
pub mod process;
pub mod sched;
pub mod syscall;

/// The state-transition rules, one per handled event kind. Syscall
/// entry/exit are not listed here: they are matched by name prefix rather
/// than exact name (see `KernelAnalysis::consume_event`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    CpuFrequency,
    IrqEntry,
    IrqExit,
    IpiEntry,
    IpiExit,
    SoftIrqEntry,
    SoftIrqExit,
    SoftIrqRaise,
    SchedSwitch,
    SchedWakeup,
    SchedMigrateTask,
    SchedPiSetprio,
    ProcessFork,
    ProcessExit,
    ProcessFree,
    StateDump,
}

impl Handler {
    pub fn handle(
        &self,
        ss: &mut StateSystem,
        event: &TraceEvent,
        layout: &EventLayout,
    ) -> Result<()> {
        match self {
            Handler::CpuFrequency => frequency::cpu_frequency(ss, event, layout),
            Handler::IrqEntry => irq::irq_entry(ss, event, layout),
            Handler::IrqExit => irq::irq_exit(ss, event, layout),
            Handler::IpiEntry => irq::ipi_entry(ss, event, layout),
            Handler::IpiExit => irq::ipi_exit(ss, event, layout),
            Handler::SoftIrqEntry => irq::softirq_entry(ss, event, layout),
            Handler::SoftIrqExit => irq::softirq_exit(ss, event, layout),
            Handler::SoftIrqRaise => irq::softirq_raise(ss, event, layout),
            Handler::SchedSwitch => sched::switch(ss, event, layout),
            Handler::SchedWakeup => sched::wakeup(ss, event, layout),
            Handler::SchedMigrateTask => sched::migrate_task(ss, event, layout),
            Handler::SchedPiSetprio => sched::pi_setprio(ss, event, layout),
            Handler::ProcessFork => process::fork(ss, event, layout),
            Handler::ProcessExit => process::exit(ss, event, layout),
            Handler::ProcessFree => process::free(ss, event, layout),
            Handler::StateDump => process::statedump(ss, event, layout),
        }
    }
}

// ----------------------------------------------------------------------
// Commonly-used attribute tree locations
// ----------------------------------------------------------------------

pub(super) fn node_cpus(ss: &mut StateSystem) -> Quark {
    ss.get_quark_absolute_and_add(&[attributes::CPUS])
}

pub(super) fn node_threads(ss: &mut StateSystem) -> Quark {
    ss.get_quark_absolute_and_add(&[attributes::THREADS])
}

pub(super) fn node_irqs(ss: &mut StateSystem) -> Quark {
    ss.get_quark_absolute_and_add(&[attributes::RESOURCES, attributes::IRQS])
}

pub(super) fn node_soft_irqs(ss: &mut StateSystem) -> Quark {
    ss.get_quark_absolute_and_add(&[attributes::RESOURCES, attributes::SOFT_IRQS])
}

pub(super) fn cpu_node(ss: &mut StateSystem, cpu: u32) -> Quark {
    let cpus = node_cpus(ss);
    ss.get_quark_relative_and_add(cpus, &[&cpu.to_string()])
}

pub(super) fn thread_node(ss: &mut StateSystem, tid: i64) -> Quark {
    let threads = node_threads(ss);
    ss.get_quark_relative_and_add(threads, &[&tid.to_string()])
}

/// Tid currently scheduled on `cpu` according to the state tree, -1 when
/// unknown.
pub(super) fn current_thread_on(ss: &mut StateSystem, cpu: u32) -> Result<i32> {
    let cpu_node = cpu_node(ss, cpu);
    let quark = ss.get_quark_relative_and_add(cpu_node, &[attributes::CURRENT_THREAD]);
    ss.query_ongoing_state(quark).int_or(-1, quark)
}

/// Puts a thread back in a "running" status: syscall mode if it has an open
/// system call, user mode otherwise.
pub(super) fn set_process_to_running(
    ss: &mut StateSystem,
    ts: u64,
    thread_node: Quark,
) -> Result<()> {
    let syscall = ss.get_quark_relative_and_add(thread_node, &[attributes::SYSTEM_CALL]);
    let value = if ss.query_ongoing_state(syscall).is_null() {
        ProcessStatus::RunUsermode.value()
    } else {
        ProcessStatus::RunSyscall.value()
    };
    let status = ss.get_quark_relative_and_add(thread_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, value, status)
}

/// Recomputes a CPU's resting status when it comes out of an interrupt:
/// user/syscall mode if a real process is scheduled on it, idle otherwise.
pub(super) fn cpu_exit_interrupt(ss: &mut StateSystem, ts: u64, cpu: u32) -> Result<()> {
    let cpu_node = cpu_node(ss, cpu);
    let tid = current_thread_on(ss, cpu)?;

    let value = if tid > 0 {
        let thread = thread_node(ss, tid as i64);
        let syscall = ss.get_quark_relative(thread, &[attributes::SYSTEM_CALL])?;
        if ss.query_ongoing_state(syscall).is_null() {
            CpuStatus::RunUsermode.value()
        } else {
            CpuStatus::RunSyscall.value()
        }
    } else {
        CpuStatus::Idle.value()
    };

    let status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, value, status)
}

/// First-write-wins helper used by statedump: only writes when the attribute
/// is still in its initial null state.
pub(super) fn modify_if_unset(
    ss: &mut StateSystem,
    ts: u64,
    value: StateValue,
    quark: Quark,
) -> Result<()> {
    if ss.query_ongoing_state(quark).is_null() {
        ss.modify_attribute(ts, value, quark)?;
    }
    Ok(())
}
