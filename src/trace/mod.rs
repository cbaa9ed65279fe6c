//! Trace input.

pub mod reader;

pub use reader::TraceReader;
