//! System call entry/exit handlers.
//!
//! These are not dispatched by exact event name: any event whose name starts
//! with one of the layout's syscall prefixes lands here, and the full event
//! name becomes the value of the thread's `System_call` attribute.

use crate::events::TraceEvent;
use crate::kernel::attributes;
use crate::kernel::values::{CpuStatus, ProcessStatus};
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::StateSystem;

use super::{cpu_node, current_thread_on, thread_node};

pub fn entry(ss: &mut StateSystem, event: &TraceEvent) -> Result<()> {
    let Some(cpu) = event.cpu else { return Ok(()) };
    let tid = current_thread_on(ss, cpu)?;
    if tid <= 0 {
        // Don't know who is running, or the idle thread somehow made a
        // syscall; nothing sensible to record.
        return Ok(());
    }
    let ts = event.ts;
    let thread = thread_node(ss, tid as i64);

    let syscall = ss.get_quark_relative_and_add(thread, &[attributes::SYSTEM_CALL]);
    ss.modify_attribute(ts, StateValue::Str(event.name.clone()), syscall)?;

    let status = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
    ss.modify_attribute(ts, ProcessStatus::RunSyscall.value(), status)?;

    let cpu_node = cpu_node(ss, cpu);
    let cpu_status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, CpuStatus::RunSyscall.value(), cpu_status)
}

pub fn exit(ss: &mut StateSystem, event: &TraceEvent) -> Result<()> {
    let Some(cpu) = event.cpu else { return Ok(()) };
    let tid = current_thread_on(ss, cpu)?;
    if tid <= 0 {
        return Ok(());
    }
    let ts = event.ts;
    let thread = thread_node(ss, tid as i64);

    let syscall = ss.get_quark_relative_and_add(thread, &[attributes::SYSTEM_CALL]);
    ss.modify_attribute(ts, StateValue::Null, syscall)?;

    let status = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
    ss.modify_attribute(ts, ProcessStatus::RunUsermode.value(), status)?;

    let cpu_node = cpu_node(ss, cpu);
    let cpu_status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, CpuStatus::RunUsermode.value(), cpu_status)
}
