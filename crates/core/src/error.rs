// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the runtime.
//!
//! Every error the dispatcher, statement runtime, timer service, or
//! connection supervisor can surface is one of these variants. The
//! `class_name` of a variant is stable: it is what `catch` filters match
//! against and what failure events carry as their second token.

use crate::name::Name;
use crate::script::SourceLocation;
use thiserror::Error;

/// Errors raised and propagated through dispatch and statement execution.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// An event was created with zero name tokens.
    #[error("an event needs at least one name token")]
    EventNoName,

    /// A waiter with this name is already pending.
    #[error("a waiter named \u{2039}{0}\u{203a} already exists")]
    DupWaiter(Name),

    /// A pending wait was cancelled.
    #[error("wait \u{2039}{0}\u{203a} was cancelled")]
    WaitCancelled(Name),

    /// Sentinel that terminates the enclosing work sequence successfully.
    /// Also delivered on dispatch cancellation.
    #[error("work sequence halted")]
    HaltSequence,

    /// An error explicitly raised by a script via `trigger error`.
    #[error("{}", params.join(" "))]
    RaisedError { params: Vec<String> },

    /// The script builder met a leading token it has no statement for.
    #[error("unknown word '{word}' at {location}")]
    UnknownWord {
        word: String,
        location: SourceLocation,
    },

    /// Malformed statement or block structure.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A literal pattern token did not match the event token at bind time.
    #[error("mismatch: '{expected}' does not fit '{got}'")]
    BadArgs { expected: String, got: String },

    /// Pattern and event token counts disagree at bind time.
    #[error("the number of event arguments does not match")]
    BadArgCount,

    /// A write was attempted on a connection that is down.
    #[error("disconnected: {0}")]
    Disconnected(Name),

    /// No data arrived within the configured window.
    #[error("timeout: no data at {0}")]
    Timeout(Name),

    /// A network-level error with an errno-style code.
    #[error("net error {0}")]
    NetError(i32),

    /// A second worker tried to occupy a reserved priority slot.
    #[error("a system worker already occupies priority {0}")]
    ReservedPrioTaken(i32),

    /// Lookup failure in a registry or collection.
    #[error("no entry for \u{2039}{0}\u{203a}")]
    NotFound(Name),
}

impl RuntimeError {
    /// Stable kind name, matchable by `catch` class filters and used as the
    /// second token of failure events.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::EventNoName => "EventNoName",
            Self::DupWaiter(_) => "DupWaiter",
            Self::WaitCancelled(_) => "WaitCancelled",
            Self::HaltSequence => "HaltSequence",
            Self::RaisedError { .. } => "RaisedError",
            Self::UnknownWord { .. } => "UnknownWord",
            Self::Syntax(_) => "SyntaxError",
            Self::BadArgs { .. } => "BadArgs",
            Self::BadArgCount => "BadArgCount",
            Self::Disconnected(_) => "Disconnected",
            Self::Timeout(_) => "Timeout",
            Self::NetError(_) => "NetError",
            Self::ReservedPrioTaken(_) => "ReservedPrioTaken",
            Self::NotFound(_) => "NotFound",
        }
    }

    /// Parameters of a user-raised error; empty for every other kind.
    pub fn params(&self) -> &[String] {
        match self {
            Self::RaisedError { params } => params,
            _ => &[],
        }
    }

    /// True for the sequence-halt / cancellation sentinel.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::HaltSequence)
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
