//! Black-box checks of the hearthd binary.

use assert_cmd::Command;

#[test]
fn help_prints_usage_and_exits_zero() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("usage: hearthd"));
}

#[test]
fn question_mark_is_help_too() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .arg("-?")
        .assert()
        .success();
}

#[test]
fn missing_config_files_exit_one() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("config file"));
}

#[test]
fn unknown_flags_exit_one() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .args(["--frobnicate", "x.hh"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("unknown option"));
}

#[test]
fn bad_trace_level_exits_one() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .args(["-t", "LOUD", "x.hh"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("trace level"));
}

#[test]
fn unreadable_config_exits_one() {
    Command::cargo_bin("hearthd")
        .unwrap()
        .args(["/nonexistent/home.hh"])
        .assert()
        .failure()
        .code(1);
}
