// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP line-protocol endpoints.
//!
//! Each declared endpoint runs a supervisor task that keeps the connection
//! up: clients reconnect after a backoff, servers keep exactly one active
//! connection (a new accept replaces the old one). State transitions are
//! reported as `("net","connect",name…)` / `("net","disconnect",name…)`
//! events; received lines are split on whitespace and dispatched as
//! `("net",name…,tokens…)`. Writes append the line delimiter.

use crate::events::EventTx;
use hearth_core::{Name, RuntimeError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default delay before a failed or lost connection is retried.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    Client,
    Server,
}

impl NetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Endpoint declaration.
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub name: Name,
    pub host: String,
    pub port: u16,
    pub kind: NetKind,
    pub retry_delay: Duration,
}

impl NetConfig {
    pub fn new(name: Name, host: impl Into<String>, port: u16, kind: NetKind) -> Self {
        Self {
            name,
            host: host.into(),
            port,
            kind,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Handle to a running endpoint supervisor.
pub struct NetHandle {
    name: Name,
    host: String,
    port: u16,
    kind: NetKind,
    line_tx: mpsc::Sender<String>,
    up: Arc<AtomicBool>,
    local: Arc<parking_lot::Mutex<Option<SocketAddr>>>,
    stop: CancellationToken,
}

impl NetHandle {
    /// Spawn the supervisor task for an endpoint.
    pub fn spawn(config: NetConfig, events: EventTx) -> Self {
        let (line_tx, line_rx) = mpsc::channel(64);
        let up = Arc::new(AtomicBool::new(false));
        let local = Arc::new(parking_lot::Mutex::new(None));
        let stop = CancellationToken::new();

        let handle = Self {
            name: config.name.clone(),
            host: config.host.clone(),
            port: config.port,
            kind: config.kind,
            line_tx,
            up: Arc::clone(&up),
            local: Arc::clone(&local),
            stop: stop.clone(),
        };

        match config.kind {
            NetKind::Client => {
                tokio::spawn(run_client(config, events, line_rx, up, stop));
            }
            NetKind::Server => {
                tokio::spawn(run_server(config, events, line_rx, up, local, stop));
            }
        }
        handle
    }

    /// Queue a line for the peer. Fails with `Disconnected` while down.
    pub async fn write(&self, line: String) -> Result<(), RuntimeError> {
        if !self.is_up() {
            return Err(RuntimeError::Disconnected(self.name.clone()));
        }
        self.line_tx
            .send(line)
            .await
            .map_err(|_| RuntimeError::Disconnected(self.name.clone()))
    }

    /// Stop the supervisor; the task emits a final disconnect if it was up.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    /// Bound address of a server endpoint once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local.lock()
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> NetKind {
        self.kind
    }
}

/// Messages from the per-connection reader task. The generation tag lets a
/// server ignore close notices from a connection it already replaced.
enum ReaderMsg {
    Line(u64, String),
    Closed(u64),
}

fn spawn_reader(read_half: OwnedReadHalf, generation: u64, tx: mpsc::Sender<ReaderMsg>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(ReaderMsg::Line(generation, line)).await.is_err() {
                        return;
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = tx.send(ReaderMsg::Closed(generation)).await;
                    return;
                }
            }
        }
    });
}

/// Received lines become `("net", name…, tokens…)` events.
async fn emit_line_event(events: &EventTx, name: &Name, line: &str) {
    let mut tokens = vec!["net".to_string()];
    tokens.extend(name.iter().cloned());
    tokens.extend(line.split_whitespace().map(str::to_string));
    events.emit(tokens).await;
}

async fn run_client(
    config: NetConfig,
    events: EventTx,
    mut line_rx: mpsc::Receiver<String>,
    up: Arc<AtomicBool>,
    stop: CancellationToken,
) {
    let addr = format!("{}:{}", config.host, config.port);
    loop {
        if stop.is_cancelled() {
            break;
        }
        let connect = tokio::select! {
            res = TcpStream::connect(&addr) => res,
            _ = stop.cancelled() => break,
        };
        match connect {
            Ok(stream) => {
                up.store(true, Ordering::Relaxed);
                events.emit_status(&["net", "connect"], &[], &config.name).await;
                drive_connection(stream, &config.name, &events, &mut line_rx, &stop).await;
                up.store(false, Ordering::Relaxed);
                events
                    .emit_status(&["net", "disconnect"], &[], &config.name)
                    .await;
                if stop.is_cancelled() {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(name = %config.name, %addr, error = %err, "connect failed");
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(config.retry_delay) => {}
            _ = stop.cancelled() => break,
        }
    }
}

/// Run one established client connection until it closes or the endpoint
/// stops.
async fn drive_connection(
    stream: TcpStream,
    name: &Name,
    events: &EventTx,
    line_rx: &mut mpsc::Receiver<String>,
    stop: &CancellationToken,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (reader_tx, mut reader_rx) = mpsc::channel(64);
    spawn_reader(read_half, 0, reader_tx);

    loop {
        tokio::select! {
            msg = reader_rx.recv() => match msg {
                Some(ReaderMsg::Line(_, line)) => emit_line_event(events, name, &line).await,
                Some(ReaderMsg::Closed(_)) | None => return,
            },
            line = line_rx.recv() => match line {
                Some(line) => {
                    if write_line(&mut write_half, &line).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
            _ = stop.cancelled() => return,
        }
    }
}

async fn run_server(
    config: NetConfig,
    events: EventTx,
    mut line_rx: mpsc::Receiver<String>,
    up: Arc<AtomicBool>,
    local: Arc<parking_lot::Mutex<Option<SocketAddr>>>,
    stop: CancellationToken,
) {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = loop {
        let bind = tokio::select! {
            res = TcpListener::bind(&addr) => res,
            _ = stop.cancelled() => return,
        };
        match bind {
            Ok(listener) => break listener,
            Err(err) => {
                tracing::warn!(name = %config.name, %addr, error = %err, "listen failed");
                tokio::select! {
                    _ = tokio::time::sleep(config.retry_delay) => {}
                    _ = stop.cancelled() => return,
                }
            }
        }
    };
    if let Ok(bound) = listener.local_addr() {
        *local.lock() = Some(bound);
    }

    let (reader_tx, mut reader_rx) = mpsc::channel(64);
    let mut generation: u64 = 0;
    let mut current: Option<OwnedWriteHalf> = None;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(name = %config.name, %peer, "client connected");
                    generation += 1;
                    let (read_half, write_half) = stream.into_split();
                    spawn_reader(read_half, generation, reader_tx.clone());
                    // a replaced connection is dropped silently; the
                    // connect event fires only on the down->up transition
                    let was_up = current.replace(write_half).is_some();
                    if !was_up {
                        up.store(true, Ordering::Relaxed);
                        events.emit_status(&["net", "connect"], &[], &config.name).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(name = %config.name, error = %err, "accept failed");
                }
            },
            msg = reader_rx.recv() => match msg {
                Some(ReaderMsg::Line(gen, line)) if gen == generation => {
                    emit_line_event(&events, &config.name, &line).await;
                }
                Some(ReaderMsg::Closed(gen)) if gen == generation => {
                    // a write error may already have taken the conn down
                    if current.take().is_some() {
                        up.store(false, Ordering::Relaxed);
                        events
                            .emit_status(&["net", "disconnect"], &[], &config.name)
                            .await;
                    }
                }
                // stale generation: connection already replaced
                Some(_) => {}
                None => return,
            },
            line = line_rx.recv() => match line {
                Some(line) => {
                    if let Some(write_half) = current.as_mut() {
                        if write_line(write_half, &line).await.is_err() {
                            current = None;
                            up.store(false, Ordering::Relaxed);
                            events
                                .emit_status(&["net", "disconnect"], &[], &config.name)
                                .await;
                        }
                    }
                }
                None => break,
            },
            _ = stop.cancelled() => break,
        }
    }

    if up.swap(false, Ordering::Relaxed) {
        events
            .emit_status(&["net", "disconnect"], &[], &config.name)
            .await;
    }
}

async fn write_line(write_half: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod tests;
