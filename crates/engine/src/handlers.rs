// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker implementations: script handlers and the two system workers.

use crate::collect::Collected;
use crate::matcher::Pattern;
use crate::registry::{LOGGER_PRIO, SHUTDOWN_PRIO};
use crate::runtime::Runtime;
use crate::stmt::{run_list, Stmt};
use crate::worker::Worker;
use async_trait::async_trait;
use hearth_core::{Context, Event, LogLevel, RuntimeError, Value, ERROR_KEY};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A handler registered by an `on …:` statement: pattern, priority,
/// compiled body, and the defining context as closure.
pub struct OnHandler {
    id: u64,
    prio: i32,
    pattern: Pattern,
    display_name: Option<String>,
    doc: Option<String>,
    body: Arc<Vec<Stmt>>,
    closure: Context,
}

impl OnHandler {
    pub fn new(
        id: u64,
        prio: i32,
        pattern: Pattern,
        display_name: Option<String>,
        doc: Option<String>,
        body: Arc<Vec<Stmt>>,
        closure: Context,
    ) -> Self {
        Self {
            id,
            prio,
            pattern,
            display_name,
            doc,
            body,
            closure,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

#[async_trait]
impl Worker for OnHandler {
    fn id(&self) -> u64 {
        self.id
    }

    fn prio(&self) -> i32 {
        self.prio
    }

    fn label(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{} \u{2039}{name}\u{203a}", self.pattern.label()),
            None => self.pattern.label(),
        }
    }

    fn display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn matches(&self, event: &Event) -> bool {
        self.pattern.matches(event.tokens())
    }

    /// Handlers listening on `error …` participate in the failure pipeline.
    fn consumes_errors(&self) -> bool {
        self.pattern.first_literal() == Some("error")
    }

    async fn process(
        &self,
        rt: &Runtime,
        event: &Event,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let ctx = self.closure.child();
        self.pattern.bind(event.tokens(), &ctx)?;
        if let Some(err) = event.error() {
            ctx.set(ERROR_KEY, Value::Error(Arc::clone(err)));
        }
        run_list(&self.body, rt, &ctx, cancel).await
    }
}

impl Collected for OnHandler {
    fn info(&self) -> Option<String> {
        Some(self.label())
    }

    fn detail(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("id".to_string(), self.id.to_string()),
            ("pattern".to_string(), self.pattern.label()),
            ("prio".to_string(), self.prio.to_string()),
        ];
        if let Some(name) = &self.display_name {
            rows.push(("name".to_string(), name.clone()));
        }
        if let Some(doc) = &self.doc {
            rows.push(("doc".to_string(), doc.clone()));
        }
        rows
    }
}

/// System worker in the lowest reserved slot: records every event before
/// any user handler runs, and every failure event with its error.
pub struct EventLogger {
    id: u64,
}

impl EventLogger {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Worker for EventLogger {
    fn id(&self) -> u64 {
        self.id
    }

    fn prio(&self) -> i32 {
        LOGGER_PRIO
    }

    fn label(&self) -> String {
        "event logger".to_string()
    }

    fn matches(&self, _event: &Event) -> bool {
        true
    }

    fn consumes_errors(&self) -> bool {
        true
    }

    async fn process(
        &self,
        rt: &Runtime,
        event: &Event,
        _cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        match event.error() {
            Some(err) => {
                let mut line = format!("ERROR: {}: {err}", err.class_name());
                if let Some(within) = event.within() {
                    line.push_str(&format!(" in: {within}"));
                }
                rt.log(LogLevel::Error, &line);
            }
            None => rt.log(LogLevel::Debug, &format!("EVENT: {event}")),
        }
        Ok(())
    }
}

/// System worker in the highest reserved slot: runs last for the shutdown
/// event, stops every endpoint and adapter, then ends the engine loop.
pub struct ShutdownWorker {
    id: u64,
}

impl ShutdownWorker {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Worker for ShutdownWorker {
    fn id(&self) -> u64 {
        self.id
    }

    fn prio(&self) -> i32 {
        SHUTDOWN_PRIO
    }

    fn label(&self) -> String {
        "shutdown cleanup".to_string()
    }

    fn matches(&self, event: &Event) -> bool {
        event.is(&["shutdown"])
    }

    async fn process(
        &self,
        rt: &Runtime,
        _event: &Event,
        _cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        rt.log(LogLevel::Info, "shutting down");
        rt.stop_endpoints();
        rt.stop();
        Ok(())
    }
}
