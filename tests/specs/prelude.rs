//! Shared helpers for the behavioral specs.

use hearth_core::{Event, LogLevel, LogSink, RuntimeError};
use hearth_engine::Runtime;
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink that captures log lines for assertions.
#[derive(Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

#[allow(dead_code)]
impl CaptureSink {
    pub fn install(rt: &Runtime) -> Arc<Self> {
        let sink = Arc::new(Self::default());
        rt.set_sink(Arc::clone(&sink) as Arc<dyn LogSink>);
        sink
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, line)| line.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|(_, line)| line.contains(needle))
            .count()
    }

    /// Every line in arrival order, regardless of level.
    pub fn all(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Wait until a line containing `needle` shows up.
    pub async fn expect(&self, needle: &str) {
        let deadline = std::time::Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            while !self.contains(needle) {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("log line containing '{needle}' never appeared"));
    }
}

impl LogSink for CaptureSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// Run a script source through the tokenizer, builder, and runtime.
#[allow(dead_code)]
pub async fn load_script(rt: &Arc<Runtime>, source: &str) -> Result<(), RuntimeError> {
    let items = hearth_daemon::parse::script_items(source, "spec")?;
    let stmts = hearth_engine::compile(&items)?;
    let ctx = hearth_core::Context::new();
    let cancel = rt.stop_token();
    for stmt in &stmts {
        stmt.exec(rt, &ctx, &cancel).await?;
    }
    Ok(())
}

/// Dispatch an event built from words.
#[allow(dead_code)]
pub async fn dispatch(
    rt: &Arc<Runtime>,
    words: &[&str],
    return_errors: bool,
) -> Result<(), RuntimeError> {
    let event = Event::from_words(rt.event_ids(), words)?;
    rt.process_event(event, return_errors).await
}
