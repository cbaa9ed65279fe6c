//! Attribute path vocabulary shared by the kernel event handlers.
//!
//! Layout of the kernel state tree:
//!
//! ```text
//! CPUs/<cpu>/Current_thread
//!            Status
//!            Current_frequency
//!            Min_frequency
//!            Max_frequency
//!            IRQs/<irq>
//!            Soft_IRQs/<vec>
//! Threads/<tid>/Status
//!               Exec_name
//!               PPID
//!               Prio
//!               System_call
//!               Current_cpu_rq
//! Resources/IRQs/<irq>        (aggregate: CPU currently owning the line)
//! Resources/Soft_IRQs/<vec>
//! ```

pub const CPUS: &str = "CPUs";
pub const THREADS: &str = "Threads";
pub const RESOURCES: &str = "Resources";

pub const CURRENT_THREAD: &str = "Current_thread";
pub const STATUS: &str = "Status";
pub const CURRENT_FREQUENCY: &str = "Current_frequency";
pub const MIN_FREQUENCY: &str = "Min_frequency";
pub const MAX_FREQUENCY: &str = "Max_frequency";
pub const IRQS: &str = "IRQs";
pub const SOFT_IRQS: &str = "Soft_IRQs";

pub const EXEC_NAME: &str = "Exec_name";
pub const PPID: &str = "PPID";
pub const PRIO: &str = "Prio";
pub const SYSTEM_CALL: &str = "System_call";
pub const CURRENT_CPU_RQ: &str = "Current_cpu_rq";
