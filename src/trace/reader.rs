//! JSON trace file reader.
//!
//! Accepts one JSON event object per line, or a pretty-printed JSON array
//! with one object per line: each line is scanned for its outermost braces
//! and everything around them (array brackets, trailing commas, whitespace)
//! is ignored. Lines without an object are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::events::TraceEvent;
use crate::{EventProcessor, EventSource};

pub struct TraceReader {
    path: PathBuf,
    cancel: Arc<AtomicBool>,
}

impl TraceReader {
    pub fn new<P: AsRef<Path>>(path: P, cancel: Arc<AtomicBool>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cancel,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for TraceReader {
    fn event_loop(&mut self, processor: &mut dyn EventProcessor) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("Error opening trace file {}", self.path.display()))?;
        pump_events(BufReader::new(file), &self.cancel, processor)
    }
}

fn pump_events<R: BufRead>(
    reader: R,
    cancel: &AtomicBool,
    processor: &mut dyn EventProcessor,
) -> Result<()> {
    for (n, line) in reader.lines().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let line = line.context("Error reading trace line")?;
        let (Some(start), Some(end)) = (line.find('{'), line.rfind('}')) else {
            continue;
        };
        let event: TraceEvent = serde_json::from_str(&line[start..=end])
            .with_context(|| format!("Malformed trace event on line {}", n + 1))?;
        processor.consume_event(&event);
    }
    Ok(())
}
