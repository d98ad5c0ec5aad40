//! External adapter processes through the full runtime.

use crate::prelude::*;
use hearth_engine::Runtime;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

fn write_script(dir: &Path, body: &str) -> String {
    let path = dir.join("adapter.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\n{body}").unwrap();
    let mut perms = file.metadata().unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

#[serial_test::serial]
#[tokio::test]
async fn wedged_adapter_is_killed_and_restarted() {
    std::env::set_var("HEARTH_RESTART_MS", "150");
    let dir = tempfile::tempdir().unwrap();
    let child = write_script(dir.path(), "sleep 60");

    let (rt, rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);
    let serving = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.serve(rx).await })
    };

    load_script(
        &rt,
        &format!(
            "on adapter wedged lamp:\n    log INFO wedged seen\n\
             on adapter connect lamp:\n    log INFO connect seen\n\
             adapter receiver lamp:\n    cmd /bin/sh {child}\n    timeout 0.3\n"
        ),
    )
    .await
    .unwrap();

    sink.expect("wedged seen").await;
    // after the restart backoff a fresh child reconnects
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while sink.count("connect seen") < 2 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("adapter was not restarted after the backoff");

    std::env::remove_var("HEARTH_RESTART_MS");
    rt.shutdown().await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), serving).await;
}

#[serial_test::serial]
#[tokio::test]
async fn adapter_datagrams_become_events() {
    let dir = tempfile::tempdir().unwrap();
    let child = write_script(dir.path(), "echo f0102; sleep 60");

    let (rt, rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);
    let serving = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.serve(rx).await })
    };

    load_script(
        &rt,
        &format!(
            "on adapter datagram *prefix *payload lamp:\n    log INFO got $prefix $payload\n\
             adapter receiver lamp:\n    cmd /bin/sh {child}\n    timeout 30\n"
        ),
    )
    .await
    .unwrap();

    sink.expect("got f 0102").await;

    rt.shutdown().await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), serving).await;
}

#[serial_test::serial]
#[tokio::test]
async fn deleted_adapters_stay_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let child = write_script(dir.path(), "sleep 60");

    let (rt, rx) = Runtime::new();
    let sink = CaptureSink::install(&rt);
    let serving = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.serve(rx).await })
    };

    load_script(
        &rt,
        &format!(
            "on adapter disconnect lamp:\n    log INFO adapter gone\n\
             adapter receiver lamp:\n    cmd /bin/sh {child}\n    timeout 30\n"
        ),
    )
    .await
    .unwrap();

    load_script(&rt, "del adapter receiver lamp\n").await.unwrap();
    sink.expect("adapter gone").await;

    // the name is free for a new declaration afterwards
    let err = load_script(&rt, "del adapter receiver lamp\n")
        .await
        .unwrap_err();
    assert_eq!(err.class_name(), "NotFound");

    rt.shutdown().await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), serving).await;
}
