// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority-bucketed worker registry.
//!
//! Workers execute in ascending numerical priority; within a priority, in
//! registration order. The slots outside `[MIN_PRIO, MAX_PRIO]` are
//! reserved for system workers and hold at most one worker each: the event
//! logger runs below every user handler, shutdown cleanup above them.

use crate::worker::Worker;
use hearth_core::{Event, RuntimeError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lowest priority available to script handlers.
pub const MIN_PRIO: i32 = 1;

/// Highest priority available to script handlers.
pub const MAX_PRIO: i32 = 99;

/// Reserved slot for the event logger.
pub const LOGGER_PRIO: i32 = 0;

/// Reserved slot for the shutdown cleanup worker.
pub const SHUTDOWN_PRIO: i32 = 100;

/// Default priority of an `on …:` handler.
pub const DEFAULT_ON_PRIO: i32 = (MIN_PRIO + MAX_PRIO) / 2 + 1;

/// True for priorities outside the script handler range.
pub fn is_reserved(prio: i32) -> bool {
    !(MIN_PRIO..=MAX_PRIO).contains(&prio)
}

#[derive(Default)]
pub struct Registry {
    buckets: BTreeMap<i32, Vec<Arc<dyn Worker>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. A reserved priority slot has exactly-once
    /// capacity regardless of registration order.
    pub fn register(&mut self, worker: Arc<dyn Worker>) -> Result<(), RuntimeError> {
        let prio = worker.prio();
        let bucket = self.buckets.entry(prio).or_default();
        if is_reserved(prio) && !bucket.is_empty() {
            return Err(RuntimeError::ReservedPrioTaken(prio));
        }
        bucket.push(worker);
        Ok(())
    }

    /// Remove a worker by id.
    pub fn unregister(&mut self, id: u64) -> Option<Arc<dyn Worker>> {
        let mut removed = None;
        self.buckets.retain(|_, bucket| {
            if removed.is_none() {
                if let Some(idx) = bucket.iter().position(|w| w.id() == id) {
                    removed = Some(bucket.remove(idx));
                }
            }
            !bucket.is_empty()
        });
        removed
    }

    /// Find a worker by numeric id or display name.
    pub fn find(&self, key: &str) -> Option<Arc<dyn Worker>> {
        if let Ok(id) = key.parse::<u64>() {
            if let Some(found) = self.iter().find(|w| w.id() == id) {
                return Some(Arc::clone(found));
            }
        }
        self.iter()
            .find(|w| w.display_name().as_deref() == Some(key))
            .map(Arc::clone)
    }

    /// All workers in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Worker>> {
        self.buckets.values().flatten()
    }

    /// Workers in dispatch order, filtered by display name when given.
    pub fn list(&self, name: Option<&str>) -> Vec<Arc<dyn Worker>> {
        self.iter()
            .filter(|w| name.is_none() || w.display_name().as_deref() == name)
            .map(Arc::clone)
            .collect()
    }

    /// Snapshot of the workers that accept `event`, in dispatch order.
    pub fn matching(&self, event: &Event) -> Vec<Arc<dyn Worker>> {
        self.iter()
            .filter(|w| w.matches(event))
            .map(Arc::clone)
            .collect()
    }

    /// Snapshot of the error-consumers that accept `event`.
    pub fn error_consumers(&self, event: &Event) -> Vec<Arc<dyn Worker>> {
        self.iter()
            .filter(|w| w.consumes_errors() && w.matches(event))
            .map(Arc::clone)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
