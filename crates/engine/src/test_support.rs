// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::runtime::Runtime;
use hearth_core::{Context, Event, LogLevel, LogSink, RuntimeError, ScriptItem, SourceLocation};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sink that captures log lines for assertions.
#[derive(Default)]
pub(crate) struct CaptureSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl CaptureSink {
    pub fn install(rt: &Runtime) -> Arc<Self> {
        let sink = Arc::new(Self::default());
        rt.set_sink(Arc::clone(&sink) as Arc<dyn LogSink>);
        sink
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, line)| line.contains(needle))
    }

    /// Messages at one level, in order.
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

pub(crate) fn toks(words: &str) -> Vec<String> {
    words.split_whitespace().map(str::to_string).collect()
}

fn loc() -> SourceLocation {
    SourceLocation::new("test", 1)
}

/// A simple statement item.
pub(crate) fn stmt_item(words: &str) -> ScriptItem {
    ScriptItem::Statement {
        tokens: toks(words),
        location: loc(),
    }
}

/// A block-opening item.
pub(crate) fn open(words: &str) -> ScriptItem {
    ScriptItem::BlockOpen {
        tokens: toks(words),
        location: loc(),
    }
}

pub(crate) fn close() -> ScriptItem {
    ScriptItem::BlockClose
}

/// Compile items and run every top-level statement against a fresh context.
pub(crate) async fn run_items(rt: &Runtime, items: &[ScriptItem]) -> Result<(), RuntimeError> {
    let stmts = crate::builder::compile(items)?;
    let ctx = Context::new();
    let cancel = CancellationToken::new();
    for stmt in &stmts {
        stmt.exec(rt, &ctx, &cancel).await?;
    }
    Ok(())
}

/// Dispatch an event built from words.
pub(crate) async fn dispatch(
    rt: &Runtime,
    words: &[&str],
    return_errors: bool,
) -> Result<(), RuntimeError> {
    let event = Event::from_words(rt.event_ids(), words)?;
    rt.process_event(event, return_errors).await
}
