// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: the unit of dispatch.
//!
//! An event is an immutable, non-empty sequence of string tokens plus a
//! monotonically increasing id. Failure events additionally carry the
//! captured error and, when known, the event that was in flight when the
//! error occurred; they inherit that event's id for correlation.

use crate::error::RuntimeError;
use crate::id::IdGen;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Event {
    id: u64,
    tokens: Vec<String>,
    error: Option<Arc<RuntimeError>>,
    within: Option<Arc<Event>>,
}

impl Event {
    /// Create an event from name tokens. Fails with `EventNoName` when the
    /// token list is empty.
    pub fn new(ids: &IdGen, tokens: Vec<String>) -> Result<Self, RuntimeError> {
        if tokens.is_empty() {
            return Err(RuntimeError::EventNoName);
        }
        Ok(Self {
            id: ids.next(),
            tokens,
            error: None,
            within: None,
        })
    }

    /// Convenience constructor for literal token lists.
    pub fn from_words(ids: &IdGen, words: &[&str]) -> Result<Self, RuntimeError> {
        Self::new(ids, words.iter().map(|w| w.to_string()).collect())
    }

    /// Build the failure event for an error, referencing the event that was
    /// being dispatched when it occurred. Tokens are `("error", <class>)`.
    pub fn failure(ids: &IdGen, error: RuntimeError, within: Option<&Event>) -> Self {
        let id = within.map(|e| e.id).unwrap_or_else(|| ids.next());
        Self {
            id,
            tokens: vec!["error".to_string(), error.class_name().to_string()],
            error: Some(Arc::new(error)),
            within: within.map(|e| Arc::new(e.clone())),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The captured error on a failure event.
    pub fn error(&self) -> Option<&Arc<RuntimeError>> {
        self.error.as_ref()
    }

    /// The event that was in flight when the error occurred.
    pub fn within(&self) -> Option<&Event> {
        self.within.as_deref()
    }

    /// True when the tokens equal `words` exactly.
    pub fn is(&self, words: &[&str]) -> bool {
        self.tokens.len() == words.len() && self.tokens.iter().zip(words).all(|(t, w)| t == w)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join("."))
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
