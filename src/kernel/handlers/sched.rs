//! Scheduler event handlers: sched_switch, wakeups, migration, priority
//! inheritance.

use crate::events::TraceEvent;
use crate::kernel::attributes;
use crate::kernel::layout::EventLayout;
use crate::kernel::values::{task_state, CpuStatus, ProcessStatus};
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::StateSystem;

use super::{cpu_node, set_process_to_running, thread_node};

/// Decodes the raw `prev_state` bitmask into the status of the thread that
/// got scheduled out. The kernel ORs a sentinel bit into the value
/// internally, so it is masked out first; state 0 means the thread was still
/// runnable.
fn decode_prev_state(prev_state: i64) -> StateValue {
    match prev_state & !task_state::TASK_STATE_MAX {
        task_state::TASK_STATE_RUNNING => ProcessStatus::WaitForCpu.value(),
        task_state::TASK_INTERRUPTIBLE | task_state::TASK_UNINTERRUPTIBLE => {
            ProcessStatus::WaitBlocked.value()
        }
        task_state::TASK_DEAD => StateValue::Null,
        _ => ProcessStatus::WaitUnknown.value(),
    }
}

pub fn switch(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let Some(cpu) = event.cpu else { return Ok(()) };
    let (Some(prev_tid), Some(prev_state), Some(next_comm), Some(next_tid), Some(next_prio)) = (
        event.field_i64(&layout.field_prev_tid),
        event.field_i64(&layout.field_prev_state),
        event.field_str(&layout.field_next_comm),
        event.field_i64(&layout.field_next_tid),
        event.field_i32(&layout.field_next_prio),
    ) else {
        return Ok(());
    };
    let ts = event.ts;

    // Status of the thread being scheduled out. Tid 0 is the per-CPU idle
    // thread and never gets thread attributes.
    if prev_tid != 0 {
        let former = thread_node(ss, prev_tid);
        let status = ss.get_quark_relative_and_add(former, &[attributes::STATUS]);
        ss.modify_attribute(ts, decode_prev_state(prev_state), status)?;
    }

    if next_tid != 0 {
        let new_thread = thread_node(ss, next_tid);

        set_process_to_running(ss, ts, new_thread)?;

        let exec_name = ss.get_quark_relative_and_add(new_thread, &[attributes::EXEC_NAME]);
        ss.modify_attribute(ts, next_comm.into(), exec_name)?;

        let prio = ss.get_quark_relative_and_add(new_thread, &[attributes::PRIO]);
        ss.modify_attribute(ts, StateValue::Int(next_prio), prio)?;

        // Make sure the PPID and system-call sub-attributes exist.
        ss.get_quark_relative_and_add(new_thread, &[attributes::SYSTEM_CALL]);
        ss.get_quark_relative_and_add(new_thread, &[attributes::PPID]);
    }

    // Current thread and status of the CPU itself.
    let cpu_node = cpu_node(ss, cpu);
    let current_thread = ss.get_quark_relative_and_add(cpu_node, &[attributes::CURRENT_THREAD]);
    ss.modify_attribute(ts, StateValue::Int(next_tid as i32), current_thread)?;

    let cpu_status = if next_tid > 0 {
        let new_thread = thread_node(ss, next_tid);
        let syscall = ss.get_quark_relative_and_add(new_thread, &[attributes::SYSTEM_CALL]);
        if ss.query_ongoing_state(syscall).is_null() {
            CpuStatus::RunUsermode.value()
        } else {
            CpuStatus::RunSyscall.value()
        }
    } else {
        CpuStatus::Idle.value()
    };
    let status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, cpu_status, status)
}

/// The thread in the event payload is now ready to run. Duplicate wakeups
/// against an already-running thread leave its status alone.
pub fn wakeup(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let Some(tid) = event.field_i64(&layout.field_tid) else {
        return Ok(());
    };
    if tid == 0 {
        // Waking the idle thread is meaningless.
        return Ok(());
    }
    let ts = event.ts;
    let thread = thread_node(ss, tid);

    let status_quark = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
    let status = ss.query_ongoing_state(status_quark).int_or(-1, status_quark)?;
    if status != ProcessStatus::RunSyscall as i32 && status != ProcessStatus::RunUsermode as i32 {
        ss.modify_attribute(ts, ProcessStatus::WaitForCpu.value(), status_quark)?;
    }

    if let Some(target_cpu) = event.field_i32(&layout.field_target_cpu) {
        let rq = ss.get_quark_relative_and_add(thread, &[attributes::CURRENT_CPU_RQ]);
        ss.modify_attribute(ts, StateValue::Int(target_cpu), rq)?;
    }

    // Priority changes made with pthread_setschedparam surface as wakeups.
    if let Some(prio) = event.field_i32(&layout.field_prio) {
        let prio_quark = ss.get_quark_relative_and_add(thread, &[attributes::PRIO]);
        ss.modify_attribute(ts, StateValue::Int(prio), prio_quark)?;
    }
    Ok(())
}

pub fn migrate_task(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(tid), Some(dest_cpu)) = (
        event.field_i64(&layout.field_tid),
        event.field_i32(&layout.field_dest_cpu),
    ) else {
        return Ok(());
    };
    if tid == 0 {
        return Ok(());
    }
    let ts = event.ts;
    let thread = thread_node(ss, tid);

    let rq = ss.get_quark_relative_and_add(thread, &[attributes::CURRENT_CPU_RQ]);
    ss.modify_attribute(ts, StateValue::Int(dest_cpu), rq)?;

    // A migration can be the first time we hear about a thread.
    let status_quark = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
    if ss.query_ongoing_state(status_quark).is_null() {
        ss.modify_attribute(ts, ProcessStatus::WaitForCpu.value(), status_quark)?;
    }
    Ok(())
}

pub fn pi_setprio(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(tid), Some(prio)) = (
        event.field_i64(&layout.field_tid),
        event.field_i32(&layout.field_new_prio),
    ) else {
        return Ok(());
    };
    let thread = thread_node(ss, tid);
    let prio_quark = ss.get_quark_relative_and_add(thread, &[attributes::PRIO]);
    ss.modify_attribute(event.ts, StateValue::Int(prio), prio_quark)
}
