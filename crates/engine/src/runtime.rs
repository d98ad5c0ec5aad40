// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Runtime` value: all process-wide mutable state behind one facade.
//!
//! A daemon wires exactly one instance; tests build fresh ones for
//! isolation. The worker registry, timer map, collection registry, and
//! connection tables live behind `parking_lot` mutexes so the engine loop,
//! dispatch tasks, and supervisor tasks share them safely.

use crate::collect::{Collected, Collections, Resolved};
use crate::dispatch;
use crate::handlers::{EventLogger, OnHandler, ShutdownWorker};
use crate::registry::{is_reserved, Registry};
use crate::stmt::AdapterDef;
use crate::timers::{Timers, WaitResult};
use crate::worker::Worker;
use hearth_adapters::{
    AdapterConfig, AdapterHandle, AdapterKind, EventTx, NetConfig, NetHandle,
};
use hearth_core::{
    Context, Event, IdGen, LogLevel, LogSink, Name, RuntimeError, SystemClock, TracingSink,
};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Capacity of the external event queue.
const EVENT_QUEUE: usize = 256;

pub struct Runtime {
    pub(crate) registry: Mutex<Registry>,
    timers: Arc<Timers<SystemClock>>,
    collections: Mutex<Collections>,
    nets: Mutex<IndexMap<Name, Arc<NetHandle>>>,
    receivers: Mutex<IndexMap<Name, Arc<AdapterHandle>>>,
    senders: Mutex<IndexMap<Name, Arc<AdapterHandle>>>,
    event_ids: IdGen,
    handler_ids: IdGen,
    wait_ids: IdGen,
    sink: Mutex<Arc<dyn LogSink>>,
    event_tx: mpsc::Sender<Event>,
    stop: CancellationToken,

    coll_on: Name,
    coll_wait: Name,
    coll_net: Name,
    coll_recv: Name,
    coll_xmit: Name,
}

impl Runtime {
    /// Build a runtime with its system workers and root collections.
    /// Returns the receiving end of the external event queue for the
    /// engine loop (see [`Runtime::serve`]).
    pub fn new() -> (Arc<Self>, mpsc::Receiver<Event>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let handler_ids = IdGen::new();

        let rt = Self {
            registry: Mutex::new(Registry::new()),
            timers: Arc::new(Timers::new(SystemClock)),
            collections: Mutex::new(Collections::new()),
            nets: Mutex::new(IndexMap::new()),
            receivers: Mutex::new(IndexMap::new()),
            senders: Mutex::new(IndexMap::new()),
            event_ids: IdGen::new(),
            handler_ids: handler_ids.clone(),
            wait_ids: IdGen::new(),
            sink: Mutex::new(Arc::new(TracingSink)),
            event_tx,
            stop: CancellationToken::new(),
            coll_on: Name::from_words("on"),
            coll_wait: Name::from_words("wait"),
            coll_net: Name::from_words("net"),
            coll_recv: Name::from_words("adapter receiver"),
            coll_xmit: Name::from_words("adapter sender"),
        };

        {
            let mut collections = rt.collections.lock();
            for name in [
                &rt.coll_on,
                &rt.coll_wait,
                &rt.coll_net,
                &rt.coll_recv,
                &rt.coll_xmit,
            ] {
                // fresh registry: the names cannot collide
                let _ = collections.add_collection(name.clone());
            }
        }
        {
            let mut registry = rt.registry.lock();
            // reserved slots; a fresh registry cannot refuse them
            let _ = registry.register(Arc::new(EventLogger::new(handler_ids.next())));
            let _ = registry.register(Arc::new(ShutdownWorker::new(handler_ids.next())));
        }

        (Arc::new(rt), event_rx)
    }

    // --- identity & logging -------------------------------------------------

    pub fn event_ids(&self) -> &IdGen {
        &self.event_ids
    }

    pub fn next_handler_id(&self) -> u64 {
        self.handler_ids.next()
    }

    pub fn next_wait_nr(&self) -> u64 {
        self.wait_ids.next()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let sink = Arc::clone(&*self.sink.lock());
        sink.log(level, message);
    }

    /// Install the logging sink collaborator.
    pub fn set_sink(&self, sink: Arc<dyn LogSink>) {
        *self.sink.lock() = sink;
    }

    // --- workers ------------------------------------------------------------

    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock()
    }

    /// Register a script handler and list it in the `on` collection.
    pub fn register_handler(&self, handler: Arc<OnHandler>) -> Result<u64, RuntimeError> {
        let id = handler.id();
        let entry: Arc<dyn Collected> = Arc::clone(&handler) as Arc<dyn Collected>;
        self.registry.lock().register(handler)?;
        self.collections
            .lock()
            .insert(&self.coll_on, Name::new(vec![id.to_string()]), entry)?;
        Ok(id)
    }

    /// Unregister a handler by numeric id or display name.
    pub fn unregister_handler(&self, key: &str) -> Result<(), RuntimeError> {
        let worker = {
            let mut registry = self.registry.lock();
            let found = registry
                .find(key)
                .ok_or_else(|| RuntimeError::NotFound(Name::from_words(key)))?;
            if is_reserved(found.prio()) {
                return Err(RuntimeError::syntax("cannot delete a system worker"));
            }
            registry.unregister(found.id());
            found
        };
        self.collections
            .lock()
            .remove(&self.coll_on, &Name::new(vec![worker.id().to_string()]));
        tracing::trace!(id = worker.id(), "handler removed");
        Ok(())
    }

    // --- timers -------------------------------------------------------------

    pub fn timers(&self) -> &Timers<SystemClock> {
        &self.timers
    }

    /// Arm a waiter and list it in the `wait` collection while pending.
    pub fn wait_start(
        &self,
        name: Name,
        seconds: f64,
    ) -> Result<oneshot::Receiver<WaitResult>, RuntimeError> {
        let waiter = self.timers.schedule(name.clone(), seconds)?;
        if self.timers.contains(&name) {
            let card = Arc::new(WaiterCard {
                name: name.clone(),
                timers: Arc::clone(&self.timers),
            });
            let _ = self.collections.lock().insert(&self.coll_wait, name, card);
        }
        Ok(waiter)
    }

    /// Drop the collection entry once a waiter resolved either way.
    pub fn wait_finished(&self, name: &Name) {
        self.collections.lock().remove(&self.coll_wait, name);
    }

    /// Spawn the timer driver task; it exits with the stop token.
    pub fn spawn_timer_driver(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let timers = Arc::clone(&self.timers);
        let stop = self.stop.clone();
        tokio::spawn(async move { timers.drive(stop).await })
    }

    // --- collections --------------------------------------------------------

    pub fn collection_names(&self) -> Vec<Name> {
        self.collections.lock().collection_names()
    }

    pub fn resolve_collected(&self, path: &[String]) -> Result<Resolved, RuntimeError> {
        self.collections.lock().resolve(path)
    }

    // --- event intake -------------------------------------------------------

    /// Handle with which supervisor tasks emit events.
    pub fn event_handle(&self) -> EventTx {
        EventTx::new(self.event_tx.clone(), self.event_ids.clone())
    }

    /// Queue an externally-generated event for the engine loop.
    pub async fn submit(&self, event: Event) {
        if self.event_tx.send(event).await.is_err() {
            tracing::debug!("event queue closed, dropping submission");
        }
    }

    /// Engine loop: serialize event starts, run each dispatch as a task.
    /// Returns when the stop token fires or the queue closes.
    pub async fn serve(self: &Arc<Self>, mut event_rx: mpsc::Receiver<Event>) {
        let driver = self.spawn_timer_driver();
        loop {
            tokio::select! {
                received = event_rx.recv() => match received {
                    Some(event) => {
                        let rt = Arc::clone(self);
                        tokio::spawn(async move {
                            let _ = rt.process_event(event, false).await;
                        });
                    }
                    None => break,
                },
                _ = self.stop.cancelled() => break,
            }
        }
        self.stop.cancel();
        let _ = driver.await;
    }

    /// Dispatch the shutdown event; the shutdown worker stops endpoints
    /// and ends the engine loop.
    pub async fn shutdown(&self) {
        match Event::from_words(&self.event_ids, &["shutdown"]) {
            Ok(event) => {
                let _ = dispatch::process(self, event, false, CancellationToken::new()).await;
            }
            Err(_) => self.stop.cancel(),
        }
    }

    /// Graceful stop: end the engine loop without the shutdown event.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    // --- TCP endpoints ------------------------------------------------------

    pub fn add_net(&self, config: NetConfig) -> Result<(), RuntimeError> {
        let name = config.name.clone();
        {
            let nets = self.nets.lock();
            if nets.contains_key(&name) {
                return Err(RuntimeError::syntax(format!(
                    "net \u{2039}{name}\u{203a} already exists"
                )));
            }
        }
        let handle = Arc::new(NetHandle::spawn(config, self.event_handle()));
        self.nets.lock().insert(name.clone(), Arc::clone(&handle));
        let _ = self
            .collections
            .lock()
            .insert(&self.coll_net, name, Arc::new(NetCard(handle)));
        Ok(())
    }

    pub async fn net_write(&self, name: &Name, line: String) -> Result<(), RuntimeError> {
        let handle = self
            .nets
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        handle.write(line).await
    }

    pub fn del_net(&self, name: &Name) -> Result<(), RuntimeError> {
        let handle = self
            .nets
            .lock()
            .shift_remove(name)
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        handle.stop();
        self.collections.lock().remove(&self.coll_net, name);
        Ok(())
    }

    pub fn net_handle(&self, name: &Name) -> Option<Arc<NetHandle>> {
        self.nets.lock().get(name).cloned()
    }

    // --- adapter processes --------------------------------------------------

    /// Declare and start an adapter process from its statement definition.
    pub fn add_adapter(&self, def: AdapterDef, ctx: &Context) -> Result<(), RuntimeError> {
        let name = Name::new(crate::stmt::resolve_tokens(&def.name, ctx)?);
        let cmd = crate::stmt::resolve_tokens(&def.cmd, ctx)?;

        let table = match def.kind {
            AdapterKind::Receiver => &self.receivers,
            AdapterKind::Sender => &self.senders,
        };
        if table.lock().contains_key(&name) {
            return Err(RuntimeError::syntax(format!(
                "adapter {} \u{2039}{name}\u{203a} already exists",
                def.kind.as_str()
            )));
        }

        let mut config = AdapterConfig::new(name.clone(), cmd, def.kind);
        if let Some(seconds) = def.timeout {
            config.timeout = Duration::from_secs_f64(seconds.max(0.0));
        }
        if let Some(prefixes) = &def.prefixes {
            config.prefixes = prefixes.clone();
        }

        let handle = Arc::new(AdapterHandle::spawn(config, self.event_handle()));
        table.lock().insert(name.clone(), Arc::clone(&handle));
        let collection = match def.kind {
            AdapterKind::Receiver => &self.coll_recv,
            AdapterKind::Sender => &self.coll_xmit,
        };
        let _ = self
            .collections
            .lock()
            .insert(collection, name, Arc::new(AdapterCard(handle)));
        Ok(())
    }

    pub async fn adapter_send(
        &self,
        name: &Name,
        prefix: char,
        data: &[u8],
    ) -> Result<(), RuntimeError> {
        let handle = self
            .senders
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        handle.send(prefix, data).await
    }

    pub fn del_adapter(&self, kind: AdapterKind, name: &Name) -> Result<(), RuntimeError> {
        let table = match kind {
            AdapterKind::Receiver => &self.receivers,
            AdapterKind::Sender => &self.senders,
        };
        let handle = table
            .lock()
            .shift_remove(name)
            .ok_or_else(|| RuntimeError::NotFound(name.clone()))?;
        handle.stop();
        let collection = match kind {
            AdapterKind::Receiver => &self.coll_recv,
            AdapterKind::Sender => &self.coll_xmit,
        };
        self.collections.lock().remove(collection, name);
        Ok(())
    }

    pub fn adapter_handle(&self, kind: AdapterKind, name: &Name) -> Option<Arc<AdapterHandle>> {
        match kind {
            AdapterKind::Receiver => self.receivers.lock().get(name).cloned(),
            AdapterKind::Sender => self.senders.lock().get(name).cloned(),
        }
    }

    /// Stop every endpoint and adapter (shutdown cleanup).
    pub fn stop_endpoints(&self) {
        let mut collections = self.collections.lock();
        for (name, handle) in self.nets.lock().drain(..) {
            handle.stop();
            collections.remove(&self.coll_net, &name);
        }
        for (name, handle) in self.receivers.lock().drain(..) {
            handle.stop();
            collections.remove(&self.coll_recv, &name);
        }
        for (name, handle) in self.senders.lock().drain(..) {
            handle.stop();
            collections.remove(&self.coll_xmit, &name);
        }
    }

    // --- dispatch (implemented in dispatch.rs) ------------------------------

    pub async fn process_event(
        &self,
        event: Event,
        return_errors: bool,
    ) -> Result<(), RuntimeError> {
        dispatch::process(self, event, return_errors, CancellationToken::new()).await
    }

    pub async fn process_event_with(
        &self,
        event: Event,
        return_errors: bool,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        dispatch::process(self, event, return_errors, cancel).await
    }

    pub async fn process_failure(&self, error: RuntimeError, within: Option<&Event>) {
        dispatch::process_failure(self, error, within).await;
    }
}

/// `wait` collection entry: live view of a pending timer.
struct WaiterCard {
    name: Name,
    timers: Arc<Timers<SystemClock>>,
}

impl Collected for WaiterCard {
    fn detail(&self) -> Vec<(String, String)> {
        let mut rows = vec![("name".to_string(), self.name.to_string())];
        if let Ok(remaining) = self.timers.remaining(&self.name) {
            rows.push(("remaining".to_string(), format!("{remaining:.1}")));
        }
        rows
    }
}

/// `net` collection entry.
struct NetCard(Arc<NetHandle>);

impl Collected for NetCard {
    fn info(&self) -> Option<String> {
        Some(format!(
            "{} {}:{}",
            self.0.kind().as_str(),
            self.0.host(),
            self.0.port()
        ))
    }

    fn detail(&self) -> Vec<(String, String)> {
        vec![
            ("type".to_string(), self.0.kind().as_str().to_string()),
            ("host".to_string(), self.0.host().to_string()),
            ("port".to_string(), self.0.port().to_string()),
            (
                "connected".to_string(),
                if self.0.is_up() { "yes" } else { "no" }.to_string(),
            ),
        ]
    }
}

/// `adapter receiver` / `adapter sender` collection entry.
struct AdapterCard(Arc<AdapterHandle>);

impl Collected for AdapterCard {
    fn info(&self) -> Option<String> {
        Some(self.0.cmd().join(" "))
    }

    fn detail(&self) -> Vec<(String, String)> {
        vec![
            ("command".to_string(), self.0.cmd().join(" ")),
            (
                "running".to_string(),
                if self.0.is_running() { "yes" } else { "no" }.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
