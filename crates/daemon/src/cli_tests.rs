// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn args(words: &str) -> Vec<String> {
    words.split_whitespace().map(str::to_string).collect()
}

#[test]
fn scripts_are_required() {
    let err = parse_args(&[]).unwrap_err();
    assert!(err.contains("config file"));
}

#[test]
fn defaults_are_panic_level_without_stacks() {
    match parse_args(&args("home.hh")).unwrap() {
        CliAction::Run(opts) => {
            assert_eq!(opts.trace_level, Some(LogLevel::Panic));
            assert!(!opts.stack_traces);
            assert_eq!(opts.scripts, [PathBuf::from("home.hh")]);
        }
        CliAction::Help => panic!("expected run"),
    }
}

#[yare::parameterized(
    short    = { "-h" },
    question = { "-?" },
    long     = { "--help" },
)]
fn help_flags_win(flag: &str) {
    assert_eq!(parse_args(&args(flag)).unwrap(), CliAction::Help);
}

#[test]
fn trace_level_parses_and_none_disables() {
    match parse_args(&args("-t DEBUG a.hh b.hh")).unwrap() {
        CliAction::Run(opts) => {
            assert_eq!(opts.trace_level, Some(LogLevel::Debug));
            assert_eq!(opts.scripts.len(), 2);
        }
        CliAction::Help => panic!("expected run"),
    }
    match parse_args(&args("-t NONE a.hh")).unwrap() {
        CliAction::Run(opts) => assert_eq!(opts.trace_level, None),
        CliAction::Help => panic!("expected run"),
    }
}

#[test]
fn bad_levels_and_flags_are_errors() {
    assert!(parse_args(&args("-t LOUD a.hh")).unwrap_err().contains("trace level"));
    assert!(parse_args(&args("-t")).unwrap_err().contains("level"));
    assert!(parse_args(&args("-x a.hh")).unwrap_err().contains("unknown option"));
}

#[test]
fn stack_flag_is_recognized() {
    match parse_args(&args("-s a.hh")).unwrap() {
        CliAction::Run(opts) => assert!(opts.stack_traces),
        CliAction::Help => panic!("expected run"),
    }
}
