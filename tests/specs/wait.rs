//! Named waits: scheduling, cancellation, update.

use crate::prelude::*;
use hearth_core::{Event, Name};
use hearth_engine::Runtime;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn wait_resolves_after_its_duration() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);
    let _driver = rt.spawn_timer_driver();

    load_script(&rt, "on go:\n    wait 0.1 :name quick\n    log INFO waited\n")
        .await
        .unwrap();

    let started = Instant::now();
    dispatch(&rt, &["go"], true).await.unwrap();
    let elapsed = started.elapsed();

    assert!(sink.contains("waited"));
    assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn del_wait_fails_the_waiter_with_halt_and_clears_the_map() {
    let (rt, _rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);
    let _driver = rt.spawn_timer_driver();

    load_script(&rt, "on go:\n    wait 5 :name t1\n    log INFO never\n")
        .await
        .unwrap();

    let dispatching = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move {
            let event = Event::from_words(rt.event_ids(), &["go"]).unwrap();
            rt.process_event(event, true).await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    load_script(&rt, "del wait t1\n").await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), dispatching)
        .await
        .expect("dispatch hung")
        .expect("dispatch panicked");
    // HaltSequence ends the sequence successfully
    assert!(result.is_ok());
    assert!(!rt.timers().contains(&Name::from_words("t1")));
    assert!(!sink.contains("never"));
}

#[tokio::test]
async fn update_converges_remaining_on_the_new_interval() {
    let (rt, _rx) = Runtime::new();
    CaptureSink::install(&rt);
    let _driver = rt.spawn_timer_driver();

    load_script(&rt, "on go:\n    wait 30 :name slow\n    log INFO done\n")
        .await
        .unwrap();

    let dispatching = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move {
            let event = Event::from_words(rt.event_ids(), &["go"]).unwrap();
            rt.process_event(event, true).await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    let name = Name::from_words("slow");
    assert!(rt.timers().remaining(&name).unwrap() > 25.0);

    // re-arm to a tenth of a second; the waiter must now fire promptly
    load_script(&rt, "wait 0.1 :name slow :update\n").await.unwrap();
    let remaining = rt.timers().remaining(&name).unwrap();
    assert!(remaining <= 0.11, "remaining {remaining}");

    let result = tokio::time::timeout(Duration::from_secs(2), dispatching)
        .await
        .expect("update did not re-arm the timer")
        .expect("dispatch panicked");
    assert!(result.is_ok());
}

#[tokio::test]
async fn duplicate_waiter_names_fail_the_second_dispatch() {
    let (rt, _rx) = Runtime::new();
    CaptureSink::install(&rt);
    let _driver = rt.spawn_timer_driver();

    load_script(
        &rt,
        "on first:\n    wait 5 :name shared\n\
         on second:\n    wait 5 :name shared\n",
    )
    .await
    .unwrap();

    let dispatching = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move {
            let event = Event::from_words(rt.event_ids(), &["first"]).unwrap();
            rt.process_event(event, true).await
        })
    };

    // while the first dispatch holds the name, a second one collides
    tokio::time::sleep(Duration::from_millis(100)).await;
    let err = dispatch(&rt, &["second"], true).await.unwrap_err();
    assert_eq!(err.class_name(), "DupWaiter");

    load_script(&rt, "del wait shared\n").await.unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(2), dispatching).await;
}
