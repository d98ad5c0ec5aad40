// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line argument handling for `hearthd`.

use hearth_core::LogLevel;
use std::path::PathBuf;

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Trace threshold; `None` means `-t NONE` (no logging at all).
    pub trace_level: Option<LogLevel>,
    /// Include error details and backtrace hints in error logs (`-s`).
    pub stack_traces: bool,
    /// Configuration script paths, dispatched in order.
    pub scripts: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run(Options),
    Help,
}

/// Parse command-line arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<CliAction, String> {
    let mut trace_level = Some(LogLevel::Panic);
    let mut stack_traces = false;
    let mut scripts = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "-?" | "--help" => return Ok(CliAction::Help),
            "-t" | "--trace" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "-t needs a level argument".to_string())?;
                if value.eq_ignore_ascii_case("NONE") {
                    trace_level = None;
                } else {
                    trace_level = Some(
                        LogLevel::parse(value)
                            .ok_or_else(|| format!("'{value}' is not a trace level"))?,
                    );
                }
            }
            "-s" | "--stack" => stack_traces = true,
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option '{flag}'"));
            }
            path => scripts.push(PathBuf::from(path)),
        }
    }

    if scripts.is_empty() {
        return Err("you need at least one config file".to_string());
    }
    Ok(CliAction::Run(Options {
        trace_level,
        stack_traces,
        scripts,
    }))
}

pub fn usage() -> &'static str {
    "usage: hearthd [-t LEVEL] [-s] CONFIG..."
}

pub fn help_text() -> String {
    format!(
        "hearthd {} - event-driven home automation daemon

{}

ARGUMENTS:
    CONFIG...        configuration scripts, read in order

OPTIONS:
    -t, --trace LEVEL    trace level (TRACE, DEBUG, INFO, WARN, ERROR,
                         PANIC, NONE); default PANIC
    -s, --stack          include error details in error logs
    -h, -?, --help       print this help text

SIGNALS:
    SIGINT     graceful stop
    SIGQUIT    immediate shutdown event
    SIGHUP     re-read the configuration scripts in order",
        env!("CARGO_PKG_VERSION"),
        usage()
    )
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
