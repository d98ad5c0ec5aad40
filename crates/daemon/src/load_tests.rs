// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hearth_core::Event;
use std::io::Write as _;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{body}").unwrap();
    path
}

#[tokio::test]
async fn scripts_register_handlers_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_script(
        dir.path(),
        "first.hh",
        "on greet:\n    trigger error hello\n",
    );
    let second = write_script(dir.path(), "second.hh", "on greet *who:\n    skip next\n");

    let (rt, _rx) = Runtime::new();
    run_scripts(&rt, &[first, second]).await.unwrap();

    // both handlers registered on top of the two system workers
    assert_eq!(rt.registry().len(), 4);

    let event = Event::from_words(rt.event_ids(), &["greet"]).unwrap();
    let err = rt.process_event(event, true).await.unwrap_err();
    assert_eq!(err.class_name(), "RaisedError");
}

#[tokio::test]
async fn missing_files_fail_the_load() {
    let (rt, _rx) = Runtime::new();
    let err = run_scripts(&rt, &[PathBuf::from("/nonexistent/x.hh")])
        .await
        .unwrap_err();
    assert_eq!(err.class_name(), "SyntaxError");
}

#[tokio::test]
async fn builder_errors_carry_their_location() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_script(dir.path(), "bad.hh", "trigger ok\nfrobnicate\n");

    let (rt, _rx) = Runtime::new();
    let err = run_file(&rt, &bad).await.unwrap_err();
    match err {
        RuntimeError::UnknownWord { word, location } => {
            assert_eq!(word, "frobnicate");
            assert_eq!(location.line, 2);
        }
        other => panic!("expected UnknownWord, got {other:?}"),
    }
}
