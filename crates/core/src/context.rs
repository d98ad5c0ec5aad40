// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation variable scopes with a lexical parent chain.
//!
//! A context is created per handler invocation and per catch entry. `get`
//! walks the parent chain, `set` writes into the local frame, and `child`
//! opens a fresh frame whose parent is the current one. Contexts are cheap
//! to clone (the frame is shared).

use crate::error::RuntimeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Well-known key under which a catch clause exposes the current error.
pub const ERROR_KEY: &str = "error_";

/// A context value: a plain token, or a captured error under [`ERROR_KEY`].
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Error(Arc<RuntimeError>),
}

impl Value {
    pub fn as_error(&self) -> Option<&Arc<RuntimeError>> {
        match self {
            Self::Error(err) => Some(err),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

#[derive(Debug, Default)]
struct Frame {
    vars: Mutex<HashMap<String, Value>>,
    parent: Option<Arc<Frame>>,
}

/// Lexically nested variable scope.
#[derive(Debug, Clone, Default)]
pub struct Context(Arc<Frame>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh child frame with the current context as parent.
    pub fn child(&self) -> Self {
        Self(Arc::new(Frame {
            vars: Mutex::new(HashMap::new()),
            parent: Some(Arc::clone(&self.0)),
        }))
    }

    /// Look up a variable, walking the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = Some(&self.0);
        while let Some(f) = frame {
            if let Some(v) = f.vars.lock().get(name) {
                return Some(v.clone());
            }
            frame = f.parent.as_ref();
        }
        None
    }

    /// Assign a variable in the local frame only.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.vars.lock().insert(name.into(), value.into());
    }

    /// The current error, if this scope is inside a catch clause.
    pub fn current_error(&self) -> Option<Arc<RuntimeError>> {
        self.get(ERROR_KEY)
            .and_then(|v| v.as_error().map(Arc::clone))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
