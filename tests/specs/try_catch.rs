//! Try/catch regions over raised errors.

use crate::prelude::*;
use hearth_core::LogLevel;
use hearth_engine::Runtime;

#[tokio::test]
async fn catch_filter_captures_error_params() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on go:\n    try:\n        trigger error kind boom\n    catch kind *msg:\n        log error WARN caught $msg\n",
    )
    .await
    .unwrap();

    dispatch(&rt, &["go"], true).await.unwrap();

    let warn = sink.at(LogLevel::Warn);
    assert!(
        warn.iter().any(|line| line.contains("caught boom")),
        "warn lines: {warn:?}"
    );
    // recovered: no failure event was emitted
    assert!(sink.at(LogLevel::Error).is_empty());
}

#[tokio::test]
async fn first_matching_catch_wins() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on go:\n    try:\n        trigger error kind boom\n    catch other *x:\n        log INFO wrong\n    catch kind *msg:\n        log INFO right $msg\n    catch:\n        log INFO too late\n",
    )
    .await
    .unwrap();

    dispatch(&rt, &["go"], true).await.unwrap();
    assert!(sink.contains("right boom"));
    assert!(!sink.contains("wrong"));
    assert!(!sink.contains("too late"));
}

#[tokio::test]
async fn empty_filter_binds_params_positionally() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on go:\n    try:\n        trigger error BAD StuffHappened\n    catch:\n        log WARN ouch: $2\n",
    )
    .await
    .unwrap();

    dispatch(&rt, &["go"], true).await.unwrap();
    assert!(sink.contains("ouch: StuffHappened"));
}

#[tokio::test]
async fn unmatched_errors_leave_the_handler() {
    let (rt, _rx) = Runtime::new();
    CaptureSink::install(&rt);

    load_script(
        &rt,
        "on go:\n    try:\n        trigger error surprising\n    catch expected:\n        log INFO nope\n",
    )
    .await
    .unwrap();

    let err = dispatch(&rt, &["go"], true).await.unwrap_err();
    assert_eq!(err.class_name(), "RaisedError");
}

#[tokio::test]
async fn catch_without_try_is_a_parse_error() {
    let (rt, _rx) = Runtime::new();
    let err = load_script(&rt, "on go:\n    catch:\n        log INFO x\n")
        .await
        .unwrap_err();
    assert_eq!(err.class_name(), "SyntaxError");
}
