// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::handlers::EventLogger;
use crate::test_support::{close, open, run_items, stmt_item, CaptureSink};
use hearth_core::Event;
use std::time::Duration;

#[tokio::test]
async fn system_workers_hold_the_reserved_slots() {
    let (rt, _rx) = Runtime::new();

    let another_logger = Arc::new(EventLogger::new(rt.next_handler_id()));
    let err = rt.registry().register(another_logger).unwrap_err();
    assert!(matches!(err, RuntimeError::ReservedPrioTaken(p) if p == crate::registry::LOGGER_PRIO));
}

#[tokio::test]
async fn system_workers_cannot_be_deleted() {
    let (rt, _rx) = Runtime::new();
    let logger_id = rt
        .registry()
        .iter()
        .find(|w| w.prio() == crate::registry::LOGGER_PRIO)
        .map(|w| w.id())
        .unwrap();

    let err = rt.unregister_handler(&logger_id.to_string()).unwrap_err();
    assert_eq!(err.class_name(), "SyntaxError");
}

#[tokio::test]
async fn handlers_are_listed_in_the_on_collection() {
    let (rt, _rx) = Runtime::new();
    CaptureSink::install(&rt);

    run_items(
        &rt,
        &[open("on a"), stmt_item("log INFO hi"), close()],
    )
    .await
    .unwrap();

    let path = vec!["on".to_string()];
    match rt.resolve_collected(&path).unwrap() {
        Resolved::Collection { entries, .. } => assert_eq!(entries.len(), 1),
        Resolved::Entry { .. } => panic!("expected collection"),
    }

    let id = rt
        .registry()
        .iter()
        .map(|w| w.id())
        .max()
        .unwrap();
    rt.unregister_handler(&id.to_string()).unwrap();
    match rt.resolve_collected(&path).unwrap() {
        Resolved::Collection { entries, .. } => assert!(entries.is_empty()),
        Resolved::Entry { .. } => panic!("expected collection"),
    }
}

#[tokio::test]
async fn waiters_appear_in_the_wait_collection_while_pending() {
    let (rt, _rx) = Runtime::new();
    let name = Name::from_words("t1");

    let _waiter = rt.wait_start(name.clone(), 30.0).unwrap();
    let path = vec!["wait".to_string(), "t1".to_string()];
    match rt.resolve_collected(&path).unwrap() {
        Resolved::Entry { entry, .. } => {
            let detail = entry.detail();
            assert!(detail.iter().any(|(field, _)| field == "remaining"));
        }
        Resolved::Collection { .. } => panic!("expected entry"),
    }

    rt.timers()
        .cancel(&name, RuntimeError::WaitCancelled(name.clone()))
        .unwrap();
    rt.wait_finished(&name);
    assert!(rt.resolve_collected(&path).is_err());
}

#[tokio::test]
async fn duplicate_net_names_are_rejected() {
    let (rt, _rx) = Runtime::new();
    let name = Name::from_words("hub");

    rt.add_net(hearth_adapters::NetConfig::new(
        name.clone(),
        "127.0.0.1",
        1,
        hearth_adapters::NetKind::Client,
    ))
    .unwrap();

    let err = rt
        .add_net(hearth_adapters::NetConfig::new(
            name.clone(),
            "127.0.0.1",
            2,
            hearth_adapters::NetKind::Client,
        ))
        .unwrap_err();
    assert_eq!(err.class_name(), "SyntaxError");

    rt.del_net(&name).unwrap();
    assert_eq!(rt.del_net(&name).unwrap_err().class_name(), "NotFound");
}

#[tokio::test]
async fn shutdown_event_stops_the_runtime() {
    let (rt, _rx) = Runtime::new();
    CaptureSink::install(&rt);

    assert!(!rt.stop_token().is_cancelled());
    rt.shutdown().await;
    assert!(rt.stop_token().is_cancelled());
}

#[tokio::test]
async fn serve_processes_submitted_events() {
    let (rt, rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);

    run_items(
        &rt,
        &[open("on ping"), stmt_item("log INFO pong"), close()],
    )
    .await
    .unwrap();

    let serving = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.serve(rx).await })
    };

    let event = Event::from_words(rt.event_ids(), &["ping"]).unwrap();
    rt.submit(event).await;

    tokio::time::timeout(Duration::from_secs(2), async {
        while !sink.contains("pong") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("submitted event was not dispatched");

    rt.stop();
    let _ = tokio::time::timeout(Duration::from_secs(2), serving).await;
}
