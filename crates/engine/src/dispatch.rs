// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch: build and run the work sequence for an event.
//!
//! The worker set is snapshotted at dispatch start, so handlers registered
//! mid-dispatch never join the in-flight sequence. Workers run strictly in
//! sequence; `HaltSequence` (raised or delivered by cancellation) ends the
//! sequence successfully, any other error aborts it and feeds the failure
//! pipeline.

use crate::runtime::Runtime;
use crate::worker::{WorkSequence, Worker};
use hearth_core::{Event, LogLevel, RuntimeError};
use tokio_util::sync::CancellationToken;

pub(crate) async fn process(
    rt: &Runtime,
    event: Event,
    return_errors: bool,
    cancel: CancellationToken,
) -> Result<(), RuntimeError> {
    let workers = rt.registry.lock().matching(&event);
    tracing::trace!(event = %event, workers = workers.len(), "work sequence created");
    let seq = WorkSequence::new(event, workers);

    match run_sequence(rt, &seq, &cancel).await {
        Ok(()) => Ok(()),
        Err(err) => {
            process_failure(rt, err.clone(), Some(&seq.event)).await;
            if return_errors {
                Err(err)
            } else {
                Ok(())
            }
        }
    }
}

async fn run_sequence(
    rt: &Runtime,
    seq: &WorkSequence,
    cancel: &CancellationToken,
) -> Result<(), RuntimeError> {
    for worker in &seq.workers {
        if cancel.is_cancelled() {
            tracing::trace!(event = %seq.event, "dispatch cancelled");
            return Ok(());
        }
        match worker.process(rt, &seq.event, cancel).await {
            Ok(()) => {}
            Err(err) if err.is_halt() => {
                tracing::trace!(event = %seq.event, worker = %worker.label(), "sequence halted");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(
                    event = %seq.event,
                    worker = %worker.label(),
                    error = %err,
                    "worker failed"
                );
                return Err(err);
            }
        }
        // explicit suspension point between workers
        tokio::task::yield_now().await;
    }
    Ok(())
}

/// Run the failure pipeline: error-consumer workers only, own errors
/// swallowed so failures can never recurse.
pub(crate) async fn process_failure(rt: &Runtime, error: RuntimeError, within: Option<&Event>) {
    let event = Event::failure(rt.event_ids(), error, within);
    let workers = rt.registry.lock().error_consumers(&event);
    let cancel = CancellationToken::new();
    for worker in workers {
        match worker.process(rt, &event, &cancel).await {
            Ok(()) => {}
            Err(err) if err.is_halt() => break,
            Err(err) => {
                rt.log(
                    LogLevel::Error,
                    &format!("error handler failed: {}: {err}", err.class_name()),
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
