//! stateline: an incremental state-history engine for Linux kernel traces.
//!
//! The crate consumes a chronologically ordered stream of kernel events
//! (scheduler, IRQ, softIRQ, syscalls, frequency changes) and builds a
//! versioned attribute store: a tree of named attributes where every node
//! carries a gap-free timeline of `[start, end] -> value` intervals. The
//! store answers "what was the state of X at time T" both while the build is
//! running and after it is sealed.
//!
//! Pipeline shape: an [`EventSource`] pumps [`TraceEvent`]s into an
//! [`EventProcessor`]; the shipped processor is
//! [`kernel::KernelAnalysis`], which dispatches each event to a
//! state-transition rule writing into a [`statesystem::StateSystem`].
//!
//! [`TraceEvent`]: events::TraceEvent

use anyhow::Result;

use crate::events::TraceEvent;

pub mod cli;
pub mod context;
pub mod events;
pub mod kernel;
pub mod statesystem;
pub mod trace;

/// Consumes trace events one at a time, in timestamp order.
pub trait EventProcessor {
    /// Called once before the first event.
    fn pre_load_init(&mut self) {}

    fn consume_event(&mut self, event: &TraceEvent);

    /// Called once after the last event (or after cancellation).
    fn finalize(&mut self) {}
}

/// Anything that can produce an ordered stream of trace events.
pub trait EventSource {
    fn event_loop(&mut self, processor: &mut dyn EventProcessor) -> Result<()>;

    /// Runs the full pipeline: init, pump, finalize. Returns the processor so
    /// the caller can harvest its results.
    fn process_events<P: EventProcessor>(&mut self, mut processor: P) -> Result<P> {
        processor.pre_load_init();
        self.event_loop(&mut processor)?;
        processor.finalize();
        Ok(processor)
    }
}
