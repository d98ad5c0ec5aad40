// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, cancellable, updatable delays.
//!
//! A timer is a named entry in the runtime-owned waiter map; while pending
//! the name is unique. Firing, cancelling, or updating-then-firing removes
//! the entry and completes the waiter's future. A driver task sleeps until
//! the next deadline and fires due timers in deadline order, ties broken by
//! insertion order.

use hearth_core::{Clock, Name, RuntimeError, SystemClock};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;

/// Completion value delivered to a waiter.
pub type WaitResult = Result<(), RuntimeError>;

struct TimerEntry {
    start: Instant,
    duration: Duration,
    seq: u64,
    tx: oneshot::Sender<WaitResult>,
}

impl TimerEntry {
    fn deadline(&self) -> Instant {
        self.start + self.duration
    }
}

#[derive(Default)]
struct TimerMap {
    entries: IndexMap<Name, TimerEntry>,
    next_seq: u64,
}

pub struct Timers<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<TimerMap>,
    changed: Notify,
}

impl<C: Clock> Timers<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(TimerMap::default()),
            changed: Notify::new(),
        }
    }

    /// Arm a timer. Non-positive durations complete immediately without
    /// entering the map; a pending duplicate name fails with `DupWaiter`.
    pub fn schedule(
        &self,
        name: Name,
        seconds: f64,
    ) -> Result<oneshot::Receiver<WaitResult>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        if seconds <= 0.0 {
            tracing::trace!(%name, seconds, "no time out");
            let _ = tx.send(Ok(()));
            return Ok(rx);
        }
        {
            let mut map = self.inner.lock();
            if map.entries.contains_key(&name) {
                return Err(RuntimeError::DupWaiter(name));
            }
            map.next_seq += 1;
            let seq = map.next_seq;
            tracing::trace!(%name, seconds, "timer armed");
            map.entries.insert(
                name,
                TimerEntry {
                    start: self.clock.now(),
                    duration: Duration::from_secs_f64(seconds),
                    seq,
                    tx,
                },
            );
        }
        self.changed.notify_one();
        Ok(rx)
    }

    /// Remove a pending timer and fail its waiter with `reason`.
    pub fn cancel(&self, name: &Name, reason: RuntimeError) -> Result<(), RuntimeError> {
        let entry = self
            .inner
            .lock()
            .entries
            .shift_remove(name)
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        let _ = entry.tx.send(Err(reason));
        self.changed.notify_one();
        Ok(())
    }

    /// Re-arm a pending timer so that `remaining` converges on `seconds`.
    pub fn update(&self, name: &Name, seconds: f64) -> Result<(), RuntimeError> {
        {
            let mut map = self.inner.lock();
            let entry = map
                .entries
                .get_mut(name)
                .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
            let elapsed = self.clock.now().saturating_duration_since(entry.start);
            entry.duration = elapsed + Duration::from_secs_f64(seconds.max(0.0));
        }
        self.changed.notify_one();
        Ok(())
    }

    /// Seconds until the timer fires (negative when overdue). Under
    /// `HEARTH_TEST` the value is `ceil(r) + 1` for deterministic logs.
    pub fn remaining(&self, name: &Name) -> Result<f64, RuntimeError> {
        let map = self.inner.lock();
        let entry = map
            .entries
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        let now = self.clock.now();
        let deadline = entry.deadline();
        let rem = if deadline >= now {
            (deadline - now).as_secs_f64()
        } else {
            -((now - deadline).as_secs_f64())
        };
        if test_mode() {
            Ok(rem.ceil() + 1.0)
        } else {
            Ok(rem)
        }
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.inner.lock().entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<Name> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Complete every due timer. Returns the number fired.
    pub fn fire_due(&self) -> usize {
        let now = self.clock.now();
        let mut due = {
            let mut map = self.inner.lock();
            let names: Vec<Name> = map
                .entries
                .iter()
                .filter(|(_, e)| e.deadline() <= now)
                .map(|(name, _)| name.clone())
                .collect();
            names
                .into_iter()
                .filter_map(|name| map.entries.shift_remove(&name).map(|e| (name, e)))
                .collect::<Vec<_>>()
        };
        due.sort_by_key(|(_, e)| (e.deadline(), e.seq));
        let count = due.len();
        for (name, entry) in due {
            tracing::trace!(%name, "timer fired");
            let _ = entry.tx.send(Ok(()));
        }
        count
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .lock()
            .entries
            .values()
            .map(TimerEntry::deadline)
            .min()
    }
}

impl Timers<SystemClock> {
    /// Drive pending timers against real time until `stop` fires.
    pub async fn drive(&self, stop: CancellationToken) {
        loop {
            match self.next_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(self.clock.now());
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {
                            self.fire_due();
                        }
                        _ = self.changed.notified() => {}
                        _ = stop.cancelled() => return,
                    }
                }
                None => {
                    tokio::select! {
                        _ = self.changed.notified() => {}
                        _ = stop.cancelled() => return,
                    }
                }
            }
        }
    }
}

fn test_mode() -> bool {
    std::env::var_os("HEARTH_TEST").is_some()
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
