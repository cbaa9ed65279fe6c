//! State values written by the kernel handlers, and the raw kernel constants
//! they are decoded from.

use crate::statesystem::interval::StateValue;

/// Status of a thread, stored under `Threads/<tid>/Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ProcessStatus {
    Unknown = 0,
    WaitBlocked = 1,
    RunUsermode = 2,
    RunSyscall = 3,
    Interrupted = 4,
    WaitForCpu = 5,
    WaitUnknown = 6,
}

impl ProcessStatus {
    pub fn value(self) -> StateValue {
        StateValue::Int(self as i32)
    }
}

/// Status of a CPU, stored under `CPUs/<cpu>/Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CpuStatus {
    Idle = 0,
    RunUsermode = 1,
    RunSyscall = 2,
    Irq = 3,
    SoftIrq = 4,
}

impl CpuStatus {
    pub fn value(self) -> StateValue {
        StateValue::Int(self as i32)
    }
}

/// Per-CPU softIRQ slot flags. A slot can be raised while a previous raise is
/// still being serviced, hence a bitmask rather than an enum.
pub const SOFT_IRQ_RAISED: i32 = 1 << 0;
pub const SOFT_IRQ_RUNNING: i32 = 1 << 1;

/// Raw `prev_state` bitmask of sched_switch, as defined by the kernel.
pub mod task_state {
    pub const TASK_STATE_RUNNING: i64 = 0;
    pub const TASK_INTERRUPTIBLE: i64 = 1;
    pub const TASK_UNINTERRUPTIBLE: i64 = 2;
    pub const TASK_DEAD: i64 = 64;

    /// Sentinel bit the kernel ORs into prev_state internally; masked out
    /// before decoding.
    pub const TASK_STATE_MAX: i64 = 1024;
}

/// `status` field values of the LTTng statedump process-state event.
pub mod statedump_state {
    pub const WAIT: i64 = 4;
    pub const WAIT_CPU: i64 = 5;
}

/// cpu_frequency events report kHz; the state tree stores Hz.
pub const FREQUENCY_MULTIPLIER: i64 = 1000;
