//! State system error taxonomy.
//!
//! All of these are recoverable from the caller's point of view: the event
//! dispatch loop catches them, drops the offending event and keeps going with
//! the history built so far.

use thiserror::Error;

use super::Quark;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// A lookup-only path resolution failed. Often just means "not created
    /// yet" and is treated as an empty result by some handlers.
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    /// A write or query timestamp violates the store bounds or the
    /// per-attribute monotonicity invariant.
    #[error("timestamp {ts} outside valid range [{start}, {end}]")]
    TimeRange { ts: u64, start: u64, end: u64 },

    /// A value of a different kind than what the attribute holds was read or
    /// written.
    #[error("value type mismatch on quark {quark}: got {got}, expected {expected}")]
    ValueType {
        quark: Quark,
        got: &'static str,
        expected: &'static str,
    },

    /// Write attempted after `close_history`.
    #[error("state history is finalized")]
    Finalized,
}

pub type Result<T> = std::result::Result<T, StateError>;
