//! Wildcard capture into the handler context.

use crate::prelude::*;
use hearth_core::LogLevel;
use hearth_engine::Runtime;

#[tokio::test]
async fn named_wildcards_bind_into_the_body() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(
        &rt,
        "on switch *state livingroom *sw:\n    log error DEBUG $state $sw\n",
    )
    .await
    .unwrap();

    dispatch(&rt, &["switch", "on", "livingroom", "main"], true)
        .await
        .unwrap();

    let debug = sink.at(LogLevel::Debug);
    assert_eq!(
        debug.iter().filter(|line| line.contains("on main")).count(),
        1,
        "debug lines: {debug:?}"
    );
}

#[tokio::test]
async fn positional_wildcards_bind_one_based_indexes() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(&rt, "on switch * * *:\n    log INFO $2 gets $1\n")
        .await
        .unwrap();

    dispatch(&rt, &["switch", "on", "livingroom", "main"], true)
        .await
        .unwrap();
    assert!(sink.contains("livingroom gets on"));
}

#[tokio::test]
async fn literal_mismatches_do_not_match() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    load_script(&rt, "on switch *state kitchen:\n    log INFO fired\n")
        .await
        .unwrap();

    dispatch(&rt, &["switch", "on", "livingroom"], true)
        .await
        .unwrap();
    assert!(!sink.contains("fired"));
}
