// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External device adapter processes.
//!
//! An adapter is a child process exchanging line-oriented datagrams with
//! the runtime (see [`crate::wire`] for the stdout format). The supervisor
//! keeps the child alive: it is restarted after a backoff when it exits or
//! wedges, and killed with SIGKILL when it produces no output for the
//! configured timeout. Stderr lines and decode failures become error
//! events; nothing here ever reaches a dispatch caller directly.

use crate::events::EventTx;
use crate::wire::{self, Decoded};
use hearth_core::{Name, RuntimeError};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default silence window before a child is declared wedged.
pub const OUTPUT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default delay before a dead or wedged child is restarted.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Default datagram prefix set.
pub const DEFAULT_PREFIXES: &str = "f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Receiver,
    Sender,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receiver => "receiver",
            Self::Sender => "sender",
        }
    }
}

/// Adapter declaration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub name: Name,
    pub cmd: Vec<String>,
    pub kind: AdapterKind,
    pub timeout: Duration,
    pub prefixes: String,
    /// First token of every event this adapter emits.
    pub event_prefix: String,
    pub restart_delay: Duration,
}

impl AdapterConfig {
    pub fn new(name: Name, cmd: Vec<String>, kind: AdapterKind) -> Self {
        Self {
            name,
            cmd,
            kind,
            timeout: OUTPUT_TIMEOUT,
            prefixes: DEFAULT_PREFIXES.to_string(),
            event_prefix: "adapter".to_string(),
            restart_delay: restart_delay(),
        }
    }
}

/// Restart backoff, overridable via HEARTH_RESTART_MS (test runs).
fn restart_delay() -> Duration {
    std::env::var("HEARTH_RESTART_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(RESTART_DELAY)
}

/// Handle to a running adapter supervisor.
pub struct AdapterHandle {
    name: Name,
    cmd: Vec<String>,
    kind: AdapterKind,
    send_tx: mpsc::Sender<String>,
    running: Arc<AtomicBool>,
    stop: CancellationToken,
}

impl AdapterHandle {
    pub fn spawn(config: AdapterConfig, events: EventTx) -> Self {
        let (send_tx, send_rx) = mpsc::channel(64);
        let running = Arc::new(AtomicBool::new(false));
        let stop = CancellationToken::new();

        let handle = Self {
            name: config.name.clone(),
            cmd: config.cmd.clone(),
            kind: config.kind,
            send_tx,
            running: Arc::clone(&running),
            stop: stop.clone(),
        };
        tokio::spawn(supervise(config, events, send_rx, running, stop));
        handle
    }

    /// Transmit a datagram through a sender adapter.
    pub async fn send(&self, prefix: char, data: &[u8]) -> Result<(), RuntimeError> {
        if self.kind != AdapterKind::Sender {
            return Err(RuntimeError::syntax(format!(
                "adapter \u{2039}{}\u{203a} is not a sender",
                self.name
            )));
        }
        if !self.is_running() {
            return Err(RuntimeError::Disconnected(self.name.clone()));
        }
        let line = format!("{prefix}{}", wire::encode_hex(data));
        self.send_tx
            .send(line)
            .await
            .map_err(|_| RuntimeError::Disconnected(self.name.clone()))
    }

    /// Stop the supervisor and kill the child.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }
}

enum ChildEnd {
    Exited,
    Wedged,
    Stopped,
}

async fn supervise(
    config: AdapterConfig,
    events: EventTx,
    mut send_rx: mpsc::Receiver<String>,
    running: Arc<AtomicBool>,
    stop: CancellationToken,
) {
    let prefix = config.event_prefix.clone();
    let prefix: &str = &prefix;
    loop {
        if stop.is_cancelled() {
            break;
        }
        match spawn_child(&config) {
            Ok(mut child) => {
                tracing::debug!(name = %config.name, "adapter started");
                running.store(true, Ordering::Relaxed);
                events
                    .emit_status(&[prefix, "connect"], &[], &config.name)
                    .await;

                let end = run_child(&config, &events, &mut child, &mut send_rx, &stop).await;

                running.store(false, Ordering::Relaxed);
                events
                    .emit_status(&[prefix, "disconnect"], &[], &config.name)
                    .await;
                if matches!(end, ChildEnd::Stopped) {
                    break;
                }
            }
            Err(err) => {
                events
                    .emit_status(
                        &[prefix, "error"],
                        &[format!("spawn failed: {err}")],
                        &config.name,
                    )
                    .await;
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(config.restart_delay) => {}
            _ = stop.cancelled() => break,
        }
    }
}

fn spawn_child(config: &AdapterConfig) -> std::io::Result<Child> {
    let Some(program) = config.cmd.first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        ));
    };
    let mut cmd = Command::new(program);
    cmd.args(&config.cmd[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // receivers never get input; the child sees EOF immediately
    cmd.stdin(match config.kind {
        AdapterKind::Sender => Stdio::piped(),
        AdapterKind::Receiver => Stdio::null(),
    });
    cmd.spawn()
}

async fn run_child(
    config: &AdapterConfig,
    events: &EventTx,
    child: &mut Child,
    send_rx: &mut mpsc::Receiver<String>,
    stop: &CancellationToken,
) -> ChildEnd {
    let prefix = config.event_prefix.as_str();
    let test_mode = std::env::var_os("HEARTH_TEST").is_some();

    let mut stdout = child
        .stdout
        .take()
        .map(|out| BufReader::new(out).lines());
    let mut stderr = child
        .stderr
        .take()
        .map(|err| BufReader::new(err).lines());
    let mut stdin = child.stdin.take();
    let mut pending_timestamp: Option<f64> = None;
    let mut send_open = true;

    let watchdog = tokio::time::sleep(config.timeout);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            line = next_or_pending(&mut stdout) => match line {
                Some(line) => {
                    watchdog.as_mut().reset(tokio::time::Instant::now() + config.timeout);
                    match config.kind {
                        AdapterKind::Receiver => {
                            handle_output(config, events, &line, test_mode, &mut pending_timestamp)
                                .await;
                        }
                        AdapterKind::Sender => {
                            tracing::debug!(name = %config.name, line, "sender output");
                        }
                    }
                }
                None => {
                    let status = child.wait().await;
                    tracing::debug!(name = %config.name, ?status, "adapter ended");
                    return ChildEnd::Exited;
                }
            },
            line = next_or_pending(&mut stderr) => if let Some(line) = line {
                watchdog.as_mut().reset(tokio::time::Instant::now() + config.timeout);
                events
                    .emit_status(&[prefix, "error"], &[line], &config.name)
                    .await;
            },
            msg = send_rx.recv(), if send_open => match (msg, stdin.as_mut()) {
                (Some(line), Some(input)) => {
                    let payload = format!("{line}\n");
                    if input.write_all(payload.as_bytes()).await.is_err() {
                        tracing::warn!(name = %config.name, "adapter stdin closed");
                    }
                }
                (None, _) => send_open = false,
                (Some(_), None) => {}
            },
            _ = &mut watchdog => {
                events.emit_status(&[prefix, "wedged"], &[], &config.name).await;
                let _ = child.start_kill();
                let _ = child.wait().await;
                return ChildEnd::Wedged;
            }
            _ = stop.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return ChildEnd::Stopped;
            }
        }
    }
}

/// Poll the next line of an optional stream; an exhausted stream pends
/// forever so the select loop stops seeing it.
async fn next_or_pending<R: tokio::io::AsyncBufRead + Unpin>(
    lines: &mut Option<Lines<R>>,
) -> Option<String> {
    match lines {
        Some(inner) => match inner.next_line().await {
            Ok(Some(line)) => Some(line.trim_end_matches('\r').to_string()),
            Ok(None) | Err(_) => {
                *lines = None;
                None
            }
        },
        None => std::future::pending().await,
    }
}

async fn handle_output(
    config: &AdapterConfig,
    events: &EventTx,
    line: &str,
    test_mode: bool,
    pending_timestamp: &mut Option<f64>,
) {
    let prefix = config.event_prefix.as_str();
    match wire::decode_line(line, &config.prefixes, test_mode) {
        Ok(Decoded::Empty) => {}
        Ok(Decoded::Timestamp(stamp)) => {
            *pending_timestamp = Some(stamp);
        }
        Ok(Decoded::Datagram {
            prefix: dgram_prefix,
            bytes,
        }) => {
            if let Some(stamp) = pending_timestamp.take() {
                tracing::trace!(name = %config.name, stamp, "datagram timestamp");
            }
            events
                .emit_status(
                    &[prefix, "datagram"],
                    &[dgram_prefix.to_string(), wire::encode_hex(&bytes)],
                    &config.name,
                )
                .await;
        }
        Ok(Decoded::TestDelay { seconds, comment }) => {
            tracing::debug!(name = %config.name, seconds, comment, "test delay");
            tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
        }
        Ok(Decoded::Unknown { prefix: ch, rest }) => {
            events
                .emit_status(
                    &[prefix, "unknown", "prefix"],
                    &[ch.to_string(), rest],
                    &config.name,
                )
                .await;
        }
        Err(err) => {
            events
                .emit_status(&[prefix, "error"], &[err.to_string()], &config.name)
                .await;
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
