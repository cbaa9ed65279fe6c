//! CPU frequency-change handler.

use crate::events::TraceEvent;
use crate::kernel::attributes;
use crate::kernel::layout::EventLayout;
use crate::kernel::values::FREQUENCY_MULTIPLIER;
use crate::statesystem::error::Result;
use crate::statesystem::interval::StateValue;
use crate::statesystem::StateSystem;

use super::cpu_node;

/// Records the new frequency, and widens the running min/max bounds. The
/// bounds are rewritten in place rather than through a state change: their
/// interval should span the whole trace with the final value, not a history
/// of intermediate bounds.
pub fn cpu_frequency(ss: &mut StateSystem, event: &TraceEvent, layout: &EventLayout) -> Result<()> {
    let (Some(cpu), Some(freq_khz)) = (
        event.field_u32(&layout.field_cpu_id),
        event.field_i64(&layout.field_frequency),
    ) else {
        return Ok(());
    };
    let ts = event.ts;
    let freq = freq_khz * FREQUENCY_MULTIPLIER;
    let node = cpu_node(ss, cpu);

    let current = ss.get_quark_relative_and_add(node, &[attributes::CURRENT_FREQUENCY]);
    ss.modify_attribute(ts, StateValue::Long(freq), current)?;

    let min = ss.get_quark_relative_and_add(node, &[attributes::MIN_FREQUENCY]);
    if freq < ss.query_ongoing_state(min).long_or(i64::MAX, min)? {
        ss.update_ongoing_state(StateValue::Long(freq), min)?;
    }

    let max = ss.get_quark_relative_and_add(node, &[attributes::MAX_FREQUENCY]);
    if freq > ss.query_ongoing_state(max).long_or(i64::MIN, max)? {
        ss.update_ongoing_state(StateValue::Long(freq), max)?;
    }
    Ok(())
}
