//! Basic dispatch and sequencing behavior.

use crate::prelude::*;
use hearth_engine::Runtime;

#[tokio::test]
async fn raised_errors_emit_a_failure_event_and_fail_the_dispatch() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on a b:\n    trigger error CAUGHT\n\
         on error RaisedError:\n    log INFO failure event seen\n",
    )
    .await
    .unwrap();

    let err = dispatch(&rt, &["a", "b"], true).await.unwrap_err();
    assert_eq!(err.class_name(), "RaisedError");

    // the failure pipeline dispatched ("error","RaisedError")
    assert!(sink.contains("failure event seen"));
    assert!(sink.contains("ERROR: RaisedError: CAUGHT"));
}

#[tokio::test]
async fn skip_next_stops_the_sequence_before_later_priorities() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on x:\n    prio 10\n    skip next\n\
         on x:\n    prio 20\n    trigger error NEVER\n",
    )
    .await
    .unwrap();

    // dispatch succeeds: the halt is not a failure
    dispatch(&rt, &["x"], true).await.unwrap();
    assert!(!sink.contains("NEVER"));
}

#[tokio::test]
async fn every_event_is_logged_before_user_handlers_run() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(&rt, "on ping:\n    log INFO handled\n")
        .await
        .unwrap();
    dispatch(&rt, &["ping"], true).await.unwrap();

    let lines = sink.all();
    let event_idx = lines
        .iter()
        .position(|l| l.contains("EVENT: ping"))
        .expect("event log line missing");
    let handler_idx = lines
        .iter()
        .position(|l| l.contains("handled"))
        .expect("handler log line missing");
    assert!(event_idx < handler_idx, "lines: {lines:?}");
}
