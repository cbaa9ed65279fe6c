//! Event layout: trace-format-specific event and field names.
//!
//! Canonical roles ("thread id", "next priority", ...) are mapped to the
//! names one particular trace producer uses. The table is built once at
//! analysis start and never touched per event. The default matches LTTng
//! kernel traces; other producers can ship a JSON layout file and load it
//! with [`EventLayout::from_file`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLayout {
    pub sched_switch: String,
    /// Several event names map to the wakeup rule (wakeup, wakeup_new,
    /// waking).
    pub sched_wakeup: Vec<String>,
    pub sched_migrate_task: String,
    pub sched_pi_setprio: String,
    pub sched_process_fork: String,
    pub sched_process_exit: String,
    pub sched_process_free: String,
    pub irq_handler_entry: String,
    pub irq_handler_exit: String,
    pub softirq_entry: String,
    pub softirq_exit: String,
    pub softirq_raise: String,
    pub ipi_entry: String,
    pub ipi_exit: String,
    pub cpu_frequency: String,
    pub statedump_process_state: String,

    pub syscall_entry_prefix: String,
    pub compat_syscall_entry_prefix: String,
    pub syscall_exit_prefix: String,
    pub compat_syscall_exit_prefix: String,

    pub field_irq: String,
    pub field_vec: String,
    pub field_ipi: String,
    pub field_tid: String,
    pub field_pid: String,
    pub field_ppid: String,
    pub field_prio: String,
    pub field_new_prio: String,
    pub field_status: String,
    pub field_name: String,
    pub field_prev_tid: String,
    pub field_prev_state: String,
    pub field_next_comm: String,
    pub field_next_tid: String,
    pub field_next_prio: String,
    pub field_parent_tid: String,
    pub field_child_comm: String,
    pub field_child_tid: String,
    pub field_target_cpu: String,
    pub field_dest_cpu: String,
    pub field_cpu_id: String,
    pub field_frequency: String,
}

impl Default for EventLayout {
    fn default() -> Self {
        Self {
            sched_switch: "sched_switch".into(),
            sched_wakeup: vec![
                "sched_wakeup".into(),
                "sched_wakeup_new".into(),
                "sched_waking".into(),
            ],
            sched_migrate_task: "sched_migrate_task".into(),
            sched_pi_setprio: "sched_pi_setprio".into(),
            sched_process_fork: "sched_process_fork".into(),
            sched_process_exit: "sched_process_exit".into(),
            sched_process_free: "sched_process_free".into(),
            irq_handler_entry: "irq_handler_entry".into(),
            irq_handler_exit: "irq_handler_exit".into(),
            softirq_entry: "softirq_entry".into(),
            softirq_exit: "softirq_exit".into(),
            softirq_raise: "softirq_raise".into(),
            ipi_entry: "ipi_entry".into(),
            ipi_exit: "ipi_exit".into(),
            cpu_frequency: "cpu_frequency".into(),
            statedump_process_state: "lttng_statedump_process_state".into(),

            syscall_entry_prefix: "syscall_entry_".into(),
            compat_syscall_entry_prefix: "compat_syscall_entry_".into(),
            syscall_exit_prefix: "syscall_exit_".into(),
            compat_syscall_exit_prefix: "compat_syscall_exit_".into(),

            field_irq: "irq".into(),
            field_vec: "vec".into(),
            field_ipi: "ipi".into(),
            field_tid: "tid".into(),
            field_pid: "pid".into(),
            field_ppid: "ppid".into(),
            field_prio: "prio".into(),
            field_new_prio: "newprio".into(),
            field_status: "status".into(),
            field_name: "name".into(),
            field_prev_tid: "prev_tid".into(),
            field_prev_state: "prev_state".into(),
            field_next_comm: "next_comm".into(),
            field_next_tid: "next_tid".into(),
            field_next_prio: "next_prio".into(),
            field_parent_tid: "parent_tid".into(),
            field_child_comm: "child_comm".into(),
            field_child_tid: "child_tid".into(),
            field_target_cpu: "target_cpu".into(),
            field_dest_cpu: "dest_cpu".into(),
            field_cpu_id: "cpu_id".into(),
            field_frequency: "state".into(),
        }
    }
}

impl EventLayout {
    /// Loads a layout table from a JSON file. Missing keys fall back to the
    /// LTTng defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Error reading layout file {}", path.as_ref().display())
        })?;
        let layout = serde_json::from_str(&contents)
            .with_context(|| format!("Error parsing layout file {}", path.as_ref().display()))?;
        Ok(layout)
    }

    pub fn is_syscall_entry(&self, event_name: &str) -> bool {
        event_name.starts_with(self.syscall_entry_prefix.as_str())
            || event_name.starts_with(self.compat_syscall_entry_prefix.as_str())
    }

    pub fn is_syscall_exit(&self, event_name: &str) -> bool {
        event_name.starts_with(self.syscall_exit_prefix.as_str())
            || event_name.starts_with(self.compat_syscall_exit_prefix.as_str())
    }
}
