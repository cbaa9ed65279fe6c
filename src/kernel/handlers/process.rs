//! Process lifecycle handlers: fork, exit, free and the statedump that
//! seeds the model with processes alive before tracing started.

use crate::events::TraceEvent;
use crate::kernel::attributes;
use crate::kernel::layout::EventLayout;
use crate::kernel::values::{statedump_state, ProcessStatus};
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::StateSystem;

use super::{modify_if_unset, thread_node};

pub fn fork(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(parent_tid), Some(child_comm), Some(child_tid)) = (
        event.field_i32(&layout.field_parent_tid),
        event.field_str(&layout.field_child_comm),
        event.field_i64(&layout.field_child_tid),
    ) else {
        return Ok(());
    };
    let ts = event.ts;
    let child_comm = child_comm.to_owned();
    let child = thread_node(ss, child_tid);

    let ppid = ss.get_quark_relative_and_add(child, &[attributes::PPID]);
    ss.modify_attribute(ts, StateValue::Int(parent_tid), ppid)?;

    let exec_name = ss.get_quark_relative_and_add(child, &[attributes::EXEC_NAME]);
    ss.modify_attribute(ts, StateValue::Str(child_comm), exec_name)?;

    let status = ss.get_quark_relative_and_add(child, &[attributes::STATUS]);
    ss.modify_attribute(ts, ProcessStatus::WaitForCpu.value(), status)?;

    // The child is born inside the parent's clone/fork syscall. If tracing
    // started mid-syscall and the parent's attribute is empty, synthesize
    // the name from the layout's entry prefix.
    let parent = thread_node(ss, parent_tid as i64);
    let parent_syscall = ss.get_quark_relative_and_add(parent, &[attributes::SYSTEM_CALL]);
    let inherited = match ss.query_ongoing_state(parent_syscall) {
        StateValue::Null => StateValue::Str(format!("{}clone", layout.syscall_entry_prefix)),
        value => value,
    };
    let child_syscall = ss.get_quark_relative_and_add(child, &[attributes::SYSTEM_CALL]);
    ss.modify_attribute(ts, inherited, child_syscall)
}

/// sched_process_exit fires while the thread can still be scheduled (it has
/// to run to finish dying), so nothing changes here; the model tears the
/// thread down on sched_process_free.
pub fn exit(_ss: &mut StateSystem, _event: &TraceEvent, _layout: &EventLayout) -> Result<()> {
    Ok(())
}

/// The kernel released the task struct: the tid may be recycled from here
/// on. The whole thread subtree is closed and removed so a later reuse of
/// the tid starts from clean null state.
pub fn free(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let Some(tid) = event.field_i64(&layout.field_tid) else {
        return Ok(());
    };
    let thread = thread_node(ss, tid);
    ss.remove_attribute(event.ts, thread)
}

/// LTTng statedump: a snapshot record for one process that was already alive
/// when tracing started. Live events are more precise than the snapshot, so
/// every write is first-write-wins.
pub fn statedump(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(tid), Some(pid), Some(ppid), Some(status), Some(name)) = (
        event.field_i64(&layout.field_tid),
        event.field_i64(&layout.field_pid),
        event.field_i32(&layout.field_ppid),
        event.field_i64(&layout.field_status),
        event.field_str(&layout.field_name),
    ) else {
        return Ok(());
    };
    let ts = event.ts;
    let name = name.to_owned();
    let thread = thread_node(ss, tid);

    // For a thread that is not the group leader, the "parent" is the group
    // leader itself rather than the leader's parent.
    let parent = if pid == tid { ppid } else { pid as i32 };

    let exec_name = ss.get_quark_relative_and_add(thread, &[attributes::EXEC_NAME]);
    modify_if_unset(ss, ts, StateValue::Str(name), exec_name)?;

    let ppid_quark = ss.get_quark_relative_and_add(thread, &[attributes::PPID]);
    modify_if_unset(ss, ts, StateValue::Int(parent), ppid_quark)?;

    // A generic "wait" in the dump does not say what the process waits on,
    // unlike a sched_switch prev_state, so it cannot become WaitBlocked.
    let mapped = match status {
        statedump_state::WAIT_CPU => ProcessStatus::WaitForCpu,
        statedump_state::WAIT => ProcessStatus::WaitUnknown,
        _ => ProcessStatus::Unknown,
    };
    let status_quark = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
    modify_if_unset(ss, ts, mapped.value(), status_quark)
}
