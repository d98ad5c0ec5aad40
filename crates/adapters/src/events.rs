// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event emission handle for supervisor tasks.
//!
//! Supervisors never call into the dispatcher directly; they construct
//! events and queue them for the engine loop.

use hearth_core::{Event, IdGen, Name};
use tokio::sync::mpsc;

/// Cloneable handle with which adapter tasks emit status and data events.
#[derive(Clone)]
pub struct EventTx {
    tx: mpsc::Sender<Event>,
    ids: IdGen,
}

impl EventTx {
    pub fn new(tx: mpsc::Sender<Event>, ids: IdGen) -> Self {
        Self { tx, ids }
    }

    /// Build and queue an event. Token lists built by supervisors are never
    /// empty, so construction cannot fail; a closed queue means the engine
    /// loop is gone and the event is dropped.
    pub async fn emit(&self, tokens: Vec<String>) {
        match Event::new(&self.ids, tokens) {
            Ok(event) => {
                if self.tx.send(event).await.is_err() {
                    tracing::debug!("event queue closed, dropping event");
                }
            }
            Err(err) => tracing::error!(error = %err, "refusing to emit unnamed event"),
        }
    }

    /// Emit `(head…, payload…, name…)` — the shape of adapter status
    /// events, whose payload precedes the source name.
    pub async fn emit_status(&self, head: &[&str], payload: &[String], name: &Name) {
        let mut tokens: Vec<String> = head.iter().map(|t| t.to_string()).collect();
        tokens.extend(payload.iter().cloned());
        tokens.extend(name.iter().cloned());
        self.emit(tokens).await;
    }
}
