//! Analysis run context, built from the command line options.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{BackendKind, CommonOpts};
use crate::kernel::layout::EventLayout;
use crate::statesystem::StateSystem;

pub struct AnalysisContext {
    pub backend: BackendKind,
    pub layout: Option<PathBuf>,
    pub verbose: bool,
    /// Set by the signal handler; the event loop stops at the next event.
    pub cancel: Arc<AtomicBool>,
}

impl From<&CommonOpts> for AnalysisContext {
    fn from(opts: &CommonOpts) -> Self {
        Self {
            backend: opts.backend,
            layout: opts.layout.clone(),
            verbose: opts.verbose,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AnalysisContext {
    pub fn event_layout(&self) -> Result<EventLayout> {
        match &self.layout {
            Some(path) => EventLayout::from_file(path),
            None => Ok(EventLayout::default()),
        }
    }

    pub fn state_system(&self) -> StateSystem {
        match self.backend {
            BackendKind::Memory => StateSystem::in_memory(0),
            BackendKind::Null => StateSystem::with_null_backend(0),
        }
    }
}
