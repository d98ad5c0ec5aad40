// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker contract and the per-dispatch work sequence.

use crate::runtime::Runtime;
use async_trait::async_trait;
use hearth_core::{Event, RuntimeError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A registered handler. Script handlers (`on …:`) and the two system
/// workers (event logger, shutdown cleanup) all implement this.
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> u64;

    fn prio(&self) -> i32;

    /// Human-readable label for listings and logs.
    fn label(&self) -> String;

    /// User-assigned display name, if any.
    fn display_name(&self) -> Option<String> {
        None
    }

    /// Does this worker want the event?
    fn matches(&self, event: &Event) -> bool;

    /// Error-consumers participate in the failure pipeline.
    fn consumes_errors(&self) -> bool {
        false
    }

    /// Run the worker for one event. `HaltSequence` terminates the
    /// enclosing work sequence successfully; any other error aborts it.
    async fn process(
        &self,
        rt: &Runtime,
        event: &Event,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError>;
}

/// An event plus the workers snapshotted for it, in execution order.
/// Lives for a single dispatch.
pub struct WorkSequence {
    pub event: Event,
    pub workers: Vec<Arc<dyn Worker>>,
}

impl WorkSequence {
    pub fn new(event: Event, workers: Vec<Arc<dyn Worker>>) -> Self {
        Self { event, workers }
    }
}
