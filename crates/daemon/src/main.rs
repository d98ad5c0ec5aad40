// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hearthd: event-driven home automation daemon.
//!
//! Reads the configuration scripts, then runs the engine loop until told
//! to stop: SIGINT ends the loop gracefully, SIGQUIT dispatches the
//! shutdown event, SIGHUP re-reads the scripts in listed order.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use hearth_core::LogLevel;
use hearth_daemon::cli::{self, CliAction, Options};
use hearth_daemon::load;
use hearth_engine::Runtime;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match cli::parse_args(&args) {
        Ok(CliAction::Help) => {
            println!("{}", cli::help_text());
            return;
        }
        Ok(CliAction::Run(options)) => options,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("{}", cli::usage());
            std::process::exit(1);
        }
    };

    setup_tracing(options.trace_level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: cannot start runtime: {err}");
            std::process::exit(1);
        }
    };
    let code = runtime.block_on(run(options));
    std::process::exit(code);
}

fn setup_tracing(level: Option<LogLevel>) {
    use tracing_subscriber::filter::LevelFilter;

    let max_level = match level {
        None => LevelFilter::OFF,
        Some(LogLevel::Trace) => LevelFilter::TRACE,
        Some(LogLevel::Debug) => LevelFilter::DEBUG,
        Some(LogLevel::Info) => LevelFilter::INFO,
        Some(LogLevel::Warn) => LevelFilter::WARN,
        Some(LogLevel::Error) | Some(LogLevel::Panic) => LevelFilter::ERROR,
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .init();
}

async fn run(options: Options) -> i32 {
    let (rt, event_rx) = Runtime::new();

    if let Err(err) = load::run_scripts(&rt, &options.scripts).await {
        log_failure(&options, &err);
        rt.process_failure(err, None).await;
        rt.shutdown().await;
        return 1;
    }
    info!(scripts = options.scripts.len(), "configuration loaded");

    let serving = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.serve(event_rx).await })
    };

    let (Ok(mut sigint), Ok(mut sigquit), Ok(mut sighup)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::quit()),
        signal(SignalKind::hangup()),
    ) else {
        error!("cannot install signal handlers");
        rt.stop();
        let _ = serving.await;
        return 1;
    };

    let stop = rt.stop_token();
    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT, stopping");
                rt.stop();
            }
            _ = sigquit.recv() => {
                info!("SIGQUIT, shutting down");
                rt.shutdown().await;
            }
            _ = sighup.recv() => {
                info!("SIGHUP, re-reading configuration");
                if let Err(err) = load::run_scripts(&rt, &options.scripts).await {
                    log_failure(&options, &err);
                    rt.process_failure(err, None).await;
                }
            }
            _ = stop.cancelled() => break,
        }
    }

    let _ = serving.await;
    info!("stopped");
    0
}

fn log_failure(options: &Options, err: &hearth_core::RuntimeError) {
    if options.stack_traces {
        error!(error = ?err, class = err.class_name(), "config failed");
    } else {
        error!(error = %err, class = err.class_name(), "config failed");
    }
}
