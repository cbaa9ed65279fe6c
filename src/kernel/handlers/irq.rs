//! Hardware interrupt, IPI and softIRQ handlers.
//!
//! Each CPU keeps a per-line slot (`CPUs/<cpu>/IRQs/<n>`,
//! `CPUs/<cpu>/Soft_IRQs/<n>`) and every line additionally has an aggregate
//! node under `Resources/` holding the CPU that last took it. SoftIRQ slots
//! are a bitmask because a vector can be raised again while a previous raise
//! is still being serviced.

use crate::events::TraceEvent;
use crate::kernel::attributes;
use crate::kernel::layout::EventLayout;
use crate::kernel::values::{CpuStatus, ProcessStatus, SOFT_IRQ_RAISED, SOFT_IRQ_RUNNING};
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::{Quark, StateSystem};

use super::{
    cpu_exit_interrupt, cpu_node, current_thread_on, node_irqs, node_soft_irqs,
    set_process_to_running, thread_node,
};

fn cpu_irq_slot(ss: &mut StateSystem, cpu: u32, irq: i64) -> Quark {
    let node = cpu_node(ss, cpu);
    ss.get_quark_relative_and_add(node, &[attributes::IRQS, &irq.to_string()])
}

fn cpu_softirq_slot(ss: &mut StateSystem, cpu: u32, vec: i64) -> Quark {
    let node = cpu_node(ss, cpu);
    ss.get_quark_relative_and_add(node, &[attributes::SOFT_IRQS, &vec.to_string()])
}

fn aggregate_irq(ss: &mut StateSystem, irq: i64) -> Quark {
    let irqs = node_irqs(ss);
    ss.get_quark_relative_and_add(irqs, &[&irq.to_string()])
}

fn aggregate_softirq(ss: &mut StateSystem, vec: i64) -> Quark {
    let soft_irqs = node_soft_irqs(ss);
    ss.get_quark_relative_and_add(soft_irqs, &[&vec.to_string()])
}

/// Clears an aggregate node, but only if this CPU still owns it. Another CPU
/// taking the same line after us keeps the aggregate pointing at it.
fn release_aggregate(ss: &mut StateSystem, ts: u64, cpu: u32, aggregate: Quark) -> Result<()> {
    if ss.query_ongoing_state(aggregate) == StateValue::Int(cpu as i32) {
        ss.modify_attribute(ts, StateValue::Null, aggregate)?;
    }
    Ok(())
}

fn interrupt_entry(ss: &mut StateSystem, ts: u64, cpu: u32, irq: i64) -> Result<()> {
    // The interrupted thread, if a real one is on the CPU.
    let tid = current_thread_on(ss, cpu)?;
    if tid > 0 {
        let thread = thread_node(ss, tid as i64);
        let status = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
        ss.modify_attribute(ts, ProcessStatus::Interrupted.value(), status)?;
    }

    let slot = cpu_irq_slot(ss, cpu, irq);
    ss.modify_attribute(ts, StateValue::Int(cpu as i32), slot)?;

    let aggregate = aggregate_irq(ss, irq);
    ss.modify_attribute(ts, StateValue::Int(cpu as i32), aggregate)?;

    let cpu_node = cpu_node(ss, cpu);
    let status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, CpuStatus::Irq.value(), status)
}

fn interrupt_exit(ss: &mut StateSystem, ts: u64, cpu: u32, irq: i64) -> Result<()> {
    let slot = cpu_irq_slot(ss, cpu, irq);
    ss.modify_attribute(ts, StateValue::Null, slot)?;

    let aggregate = aggregate_irq(ss, irq);
    release_aggregate(ss, ts, cpu, aggregate)?;

    let tid = current_thread_on(ss, cpu)?;
    if tid > 0 {
        let thread = thread_node(ss, tid as i64);
        set_process_to_running(ss, ts, thread)?;
    }
    cpu_exit_interrupt(ss, ts, cpu)
}

pub fn irq_entry(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(irq)) = (event.cpu, event.field_i64(&layout.field_irq)) else {
        return Ok(());
    };
    interrupt_entry(ss, event.ts, cpu, irq)
}

pub fn irq_exit(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(irq)) = (event.cpu, event.field_i64(&layout.field_irq)) else {
        return Ok(());
    };
    interrupt_exit(ss, event.ts, cpu, irq)
}

// IPIs are modelled as IRQ lines; only the payload field name differs.

pub fn ipi_entry(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(ipi)) = (event.cpu, event.field_i64(&layout.field_ipi)) else {
        return Ok(());
    };
    interrupt_entry(ss, event.ts, cpu, ipi)
}

pub fn ipi_exit(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(ipi)) = (event.cpu, event.field_i64(&layout.field_ipi)) else {
        return Ok(());
    };
    interrupt_exit(ss, event.ts, cpu, ipi)
}

/// A softIRQ was raised on this CPU. The RAISED bit is ORed into the per-CPU
/// slot so a raise during a running handler is kept, and the aggregate node
/// remembers this CPU as the last raiser.
pub fn softirq_raise(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(vec)) = (event.cpu, event.field_i64(&layout.field_vec)) else {
        return Ok(());
    };
    let ts = event.ts;

    let slot = cpu_softirq_slot(ss, cpu, vec);
    let flags = ss.query_ongoing_state(slot).int_or(0, slot)?;
    ss.modify_attribute(ts, StateValue::Int(flags | SOFT_IRQ_RAISED), slot)?;

    let aggregate = aggregate_softirq(ss, vec);
    ss.modify_attribute(ts, StateValue::Int(cpu as i32), aggregate)
}

pub fn softirq_entry(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(vec)) = (event.cpu, event.field_i64(&layout.field_vec)) else {
        return Ok(());
    };
    let ts = event.ts;

    let tid = current_thread_on(ss, cpu)?;
    if tid > 0 {
        let thread = thread_node(ss, tid as i64);
        let status = ss.get_quark_relative_and_add(thread, &[attributes::STATUS]);
        ss.modify_attribute(ts, ProcessStatus::Interrupted.value(), status)?;
    }

    // Entering the handler consumes the pending raise.
    let slot = cpu_softirq_slot(ss, cpu, vec);
    ss.modify_attribute(ts, StateValue::Int(SOFT_IRQ_RUNNING), slot)?;

    let aggregate = aggregate_softirq(ss, vec);
    ss.modify_attribute(ts, StateValue::Int(cpu as i32), aggregate)?;

    let cpu_node = cpu_node(ss, cpu);
    let status = ss.get_quark_relative_and_add(cpu_node, &[attributes::STATUS]);
    ss.modify_attribute(ts, CpuStatus::SoftIrq.value(), status)
}

pub fn softirq_exit(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(vec)) = (event.cpu, event.field_i64(&layout.field_vec)) else {
        return Ok(());
    };
    let ts = event.ts;

    // If the vector was raised again while running, it stays pending.
    let slot = cpu_softirq_slot(ss, cpu, vec);
    let flags = ss.query_ongoing_state(slot).int_or(0, slot)?;
    let remaining = if flags & SOFT_IRQ_RAISED != 0 {
        StateValue::Int(SOFT_IRQ_RAISED)
    } else {
        StateValue::Null
    };
    let went_idle = remaining == StateValue::Null;
    ss.modify_attribute(ts, remaining, slot)?;

    if went_idle {
        let aggregate = aggregate_softirq(ss, vec);
        release_aggregate(ss, ts, cpu, aggregate)?;
    }

    let tid = current_thread_on(ss, cpu)?;
    if tid > 0 {
        let thread = thread_node(ss, tid as i64);
        set_process_to_running(ss, ts, thread)?;
    }
    cpu_exit_interrupt(ss, ts, cpu)
}
