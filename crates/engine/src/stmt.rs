// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled statements and their execution.
//!
//! Script bodies compile to `Stmt` trees (see [`crate::builder`]) and run
//! against the caller's context: statement lists are sequential awaits,
//! `try`/`catch` is lexical, and cancellation is the `HaltSequence`
//! sentinel delivered at suspension points. Tokens are `$var`-substituted
//! against the context at execution time.

use crate::handlers::OnHandler;
use crate::matcher::Pattern;
use crate::runtime::Runtime;
use hearth_adapters::wire;
use hearth_adapters::{AdapterKind, NetConfig, NetKind};
use hearth_core::{Context, LogLevel, Name, RuntimeError, Value, ERROR_KEY};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RuntimeError>> + Send + 'a>>;

/// A compiled statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Plain statement list (`block:`).
    Block(Vec<Stmt>),
    /// `try:` with its chained `catch` clauses.
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
    },
    /// `trigger error TOKENS…`
    TriggerError { params: Vec<String> },
    /// `trigger TOKENS…` — dispatch an internal event inline.
    Trigger { tokens: Vec<String> },
    /// `log LEVEL TOKENS…`
    Log {
        level: LogLevel,
        message: Vec<String>,
    },
    /// `log error [LEVEL [TOKENS…]]` — log the current error.
    LogError {
        level: Option<LogLevel>,
        message: Vec<String>,
    },
    /// `skip next`
    SkipNext,
    /// `on TOKENS…:` — register a handler.
    On(OnDef),
    /// `del on ID-OR-NAME`
    DelOn { target: String },
    /// `wait DURATION… [:name NAME…] [:update]`
    Wait(WaitDef),
    /// `del wait NAME…`
    DelWait { name: Vec<String> },
    /// `net NAME [HOST] PORT` — declare a TCP client.
    NetConnect {
        name: Vec<String>,
        host: Option<String>,
        port: String,
    },
    /// `listen net NAME [ADDR] PORT` — declare a TCP server.
    NetListen {
        name: Vec<String>,
        host: Option<String>,
        port: String,
    },
    /// `send net NAME TEXT…`
    NetSend { name: Vec<String>, text: Vec<String> },
    /// `del net NAME…`
    DelNet { name: Vec<String> },
    /// `adapter receiver|sender NAME…:` — declare an adapter process.
    Adapter(AdapterDef),
    /// `send adapter [NAME] PREFIX HEX [:to NAME…]`
    AdapterSend {
        name: Vec<String>,
        prefix: String,
        hex: String,
    },
    /// `del adapter receiver|sender NAME…`
    DelAdapter { kind: AdapterKind, name: Vec<String> },
    /// `list [TOKENS…]` — enumerate collections or one entry.
    List { path: Vec<String> },
    /// `shutdown` — dispatch the shutdown event.
    Shutdown,
}

/// A handler definition collected from an `on …:` block.
#[derive(Debug, Clone)]
pub struct OnDef {
    pub pattern: Vec<String>,
    pub prio: i32,
    pub name: Option<String>,
    pub doc: Option<String>,
    pub body: Arc<Vec<Stmt>>,
}

/// A `wait` statement with its inline attributes.
#[derive(Debug, Clone)]
pub struct WaitDef {
    pub duration: Vec<String>,
    pub name: Option<Vec<String>>,
    pub update: bool,
}

/// An adapter declaration collected from an `adapter …:` block.
#[derive(Debug, Clone)]
pub struct AdapterDef {
    pub kind: AdapterKind,
    pub name: Vec<String>,
    pub cmd: Vec<String>,
    pub timeout: Option<f64>,
    pub prefixes: Option<String>,
}

/// One `catch` clause: an optional class-or-pattern filter plus a body.
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub filter: Vec<String>,
    pub body: Vec<Stmt>,
}

impl CatchClause {
    /// Decide whether this clause takes `err`, returning the catch context
    /// with captures and the error bound. User-raised errors match the
    /// filter as a positional pattern over their params; other errors
    /// match a single class-name token. A clause without a class filter
    /// never takes the halt/cancellation sentinel.
    pub fn match_error(&self, err: &RuntimeError, ctx: &Context) -> Option<Context> {
        let caught = ctx.child();
        caught.set(ERROR_KEY, Value::Error(Arc::new(err.clone())));

        if let RuntimeError::RaisedError { params } = err {
            if self.filter.is_empty() {
                for (i, param) in params.iter().enumerate() {
                    caught.set((i + 1).to_string(), param.as_str());
                }
                return Some(caught);
            }
            let pattern = Pattern::parse(&self.filter);
            let caps = pattern.captures(params)?;
            for (key, value) in caps {
                caught.set(key, value.as_str());
            }
            return Some(caught);
        }

        match self.filter.as_slice() {
            [] => {
                if err.is_halt() {
                    return None;
                }
                Some(caught)
            }
            [class] => (class == err.class_name()).then_some(caught),
            _ => None,
        }
    }
}

/// Run a statement list: sequential awaits, early return on the first
/// unrecovered error.
pub fn run_list<'a>(
    stmts: &'a [Stmt],
    rt: &'a Runtime,
    ctx: &'a Context,
    cancel: &'a CancellationToken,
) -> ExecFuture<'a> {
    Box::pin(async move {
        for stmt in stmts {
            stmt.exec(rt, ctx, cancel).await?;
        }
        Ok(())
    })
}

impl Stmt {
    pub fn exec<'a>(
        &'a self,
        rt: &'a Runtime,
        ctx: &'a Context,
        cancel: &'a CancellationToken,
    ) -> ExecFuture<'a> {
        Box::pin(async move {
            match self {
                Self::Block(body) => run_list(body, rt, ctx, cancel).await,

                Self::Try { body, catches } => {
                    exec_try(body, catches, rt, ctx, cancel).await
                }

                Self::TriggerError { params } => {
                    let params = resolve_tokens(params, ctx)?;
                    let err = RuntimeError::RaisedError { params };
                    rt.log(LogLevel::Trace, &format!("triggered: {err}"));
                    Err(err)
                }

                Self::Trigger { tokens } => {
                    let tokens = resolve_tokens(tokens, ctx)?;
                    let event = hearth_core::Event::new(rt.event_ids(), tokens)?;
                    // inline sub-dispatch keeps the causal order of the
                    // generating handler; its failures go through the
                    // failure pipeline, not up this statement stack
                    rt.process_event_with(event, false, cancel.child_token())
                        .await
                }

                Self::Log { level, message } => {
                    let message = resolve_tokens(message, ctx)?;
                    rt.log(*level, &message.join(" "));
                    Ok(())
                }

                Self::LogError { level, message } => {
                    let message = resolve_tokens(message, ctx)?.join(" ");
                    let level = level.unwrap_or(LogLevel::Debug);
                    match (ctx.current_error(), message.is_empty()) {
                        (Some(err), false) => {
                            rt.log(level, &format!("{message}: {}: {err}", err.class_name()));
                        }
                        (Some(err), true) => {
                            rt.log(level, &format!("{}: {err}", err.class_name()));
                        }
                        (None, false) => rt.log(level, &message),
                        (None, true) => {
                            return Err(RuntimeError::syntax(
                                "log error outside a catch needs a message",
                            ));
                        }
                    }
                    Ok(())
                }

                Self::SkipNext => Err(RuntimeError::HaltSequence),

                Self::On(def) => {
                    let pattern = Pattern::parse(&resolve_tokens(&def.pattern, ctx)?);
                    let handler = OnHandler::new(
                        rt.next_handler_id(),
                        def.prio,
                        pattern,
                        def.name.clone(),
                        def.doc.clone(),
                        Arc::clone(&def.body),
                        ctx.clone(),
                    );
                    let id = rt.register_handler(Arc::new(handler))?;
                    rt.log(LogLevel::Trace, &format!("new handler {id}"));
                    Ok(())
                }

                Self::DelOn { target } => {
                    let target = resolve_token(target, ctx)?;
                    rt.unregister_handler(&target)
                }

                Self::Wait(def) => exec_wait(def, rt, ctx, cancel).await,

                Self::DelWait { name } => {
                    let name = Name::new(resolve_tokens(name, ctx)?);
                    // HaltSequence unwinds the waiting block cleanly
                    rt.timers().cancel(&name, RuntimeError::HaltSequence)
                }

                Self::NetConnect { name, host, port } => {
                    let config = net_config(name, host, port, NetKind::Client, ctx)?;
                    rt.add_net(config)
                }

                Self::NetListen { name, host, port } => {
                    let config = net_config(name, host, port, NetKind::Server, ctx)?;
                    rt.add_net(config)
                }

                Self::NetSend { name, text } => {
                    let name = Name::new(resolve_tokens(name, ctx)?);
                    let line = resolve_tokens(text, ctx)?.join(" ");
                    rt.net_write(&name, line).await
                }

                Self::DelNet { name } => {
                    let name = Name::new(resolve_tokens(name, ctx)?);
                    rt.del_net(&name)
                }

                Self::Adapter(def) => rt.add_adapter(def.clone(), ctx),

                Self::AdapterSend { name, prefix, hex } => {
                    let name = Name::new(resolve_tokens(name, ctx)?);
                    let prefix = resolve_token(prefix, ctx)?;
                    let hex = resolve_token(hex, ctx)?;
                    let mut chars = prefix.chars();
                    let (Some(ch), None) = (chars.next(), chars.next()) else {
                        return Err(RuntimeError::syntax(format!(
                            "datagram prefix must be one character, got '{prefix}'"
                        )));
                    };
                    let bytes = wire::decode_hex(&hex)
                        .map_err(|e| RuntimeError::syntax(e.to_string()))?;
                    rt.adapter_send(&name, ch, &bytes).await
                }

                Self::DelAdapter { kind, name } => {
                    let name = Name::new(resolve_tokens(name, ctx)?);
                    rt.del_adapter(*kind, &name)
                }

                Self::List { path } => {
                    let path = resolve_tokens(path, ctx)?;
                    exec_list(&path, rt)
                }

                Self::Shutdown => {
                    rt.shutdown().await;
                    Ok(())
                }
            }
        })
    }
}

async fn exec_try(
    body: &[Stmt],
    catches: &[CatchClause],
    rt: &Runtime,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<(), RuntimeError> {
    let Err(err) = run_list(body, rt, ctx, cancel).await else {
        return Ok(());
    };
    if catches.is_empty() {
        // bare try: the failure feeds the failure pipeline and the block
        // continues, but the halt sentinel still unwinds
        if err.is_halt() {
            return Err(err);
        }
        rt.process_failure(err, None).await;
        return Ok(());
    }
    for clause in catches {
        if let Some(caught) = clause.match_error(&err, ctx) {
            return run_list(&clause.body, rt, &caught, cancel).await;
        }
    }
    Err(err)
}

async fn exec_wait(
    def: &WaitDef,
    rt: &Runtime,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<(), RuntimeError> {
    let duration_tokens = resolve_tokens(&def.duration, ctx)?;
    let seconds = parse_duration(&duration_tokens)?;

    let name = match &def.name {
        Some(tokens) => Name::new(resolve_tokens(tokens, ctx)?),
        None => Name::new(vec!["_wait".to_string(), rt.next_wait_nr().to_string()]),
    };

    if def.update {
        return rt.timers().update(&name, seconds);
    }

    let waiter = rt.wait_start(name.clone(), seconds)?;
    let result = tokio::select! {
        completed = waiter => completed.unwrap_or(Err(RuntimeError::HaltSequence)),
        _ = cancel.cancelled() => {
            let _ = rt.timers().cancel(&name, RuntimeError::HaltSequence);
            Err(RuntimeError::HaltSequence)
        }
    };
    rt.wait_finished(&name);
    result
}

fn exec_list(path: &[String], rt: &Runtime) -> Result<(), RuntimeError> {
    use crate::collect::Resolved;

    if path.is_empty() {
        for name in rt.collection_names() {
            rt.log(LogLevel::Info, &name.to_string());
        }
        return Ok(());
    }
    match rt.resolve_collected(path)? {
        Resolved::Collection { name, entries } => {
            for (entry_name, entry) in entries {
                match entry.info() {
                    Some(info) => {
                        rt.log(LogLevel::Info, &format!("{name}: {entry_name}: {info}"));
                    }
                    None => rt.log(LogLevel::Info, &format!("{name}: {entry_name}")),
                }
            }
        }
        Resolved::Entry { name, entry } => {
            for (field, value) in entry.detail() {
                rt.log(LogLevel::Info, &format!("{name}: {field}: {value}"));
            }
        }
    }
    Ok(())
}

fn net_config(
    name: &[String],
    host: &Option<String>,
    port: &str,
    kind: NetKind,
    ctx: &Context,
) -> Result<NetConfig, RuntimeError> {
    let name = Name::new(resolve_tokens(name, ctx)?);
    let host = match host {
        Some(h) => resolve_token(h, ctx)?,
        None => "localhost".to_string(),
    };
    let port = resolve_token(port, ctx)?;
    let port: u16 = port
        .parse()
        .map_err(|_| RuntimeError::syntax(format!("bad port '{port}'")))?;
    Ok(NetConfig::new(name, host, port, kind))
}

/// Substitute `$var` references against the context.
pub fn resolve_tokens(tokens: &[String], ctx: &Context) -> Result<Vec<String>, RuntimeError> {
    tokens.iter().map(|tok| resolve_token(tok, ctx)).collect()
}

fn resolve_token(token: &str, ctx: &Context) -> Result<String, RuntimeError> {
    if let Some(var) = token.strip_prefix('$') {
        if !var.is_empty() {
            return match ctx.get(var) {
                Some(value) => Ok(value.to_string()),
                None => Err(RuntimeError::NotFound(Name::from_words(var))),
            };
        }
    }
    Ok(token.to_string())
}

/// Parse a duration token sequence: values with optional `s/m/h/d/w`
/// suffixes, combined with `+` and `-` (`2m - 10s`).
pub fn parse_duration(tokens: &[String]) -> Result<f64, RuntimeError> {
    let mut total = 0.0f64;
    let mut sign = 1.0f64;
    let mut seen = false;
    for token in tokens {
        match token.as_str() {
            "+" => sign = 1.0,
            "-" => sign = -1.0,
            term => {
                total += sign * parse_term(term)?;
                sign = 1.0;
                seen = true;
            }
        }
    }
    if !seen {
        return Err(RuntimeError::syntax("usage: wait \u{2039}interval\u{203a}"));
    }
    Ok(total)
}

fn parse_term(term: &str) -> Result<f64, RuntimeError> {
    let (number, unit) = match term.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => (&term[..term.len() - 1], Some(ch)),
        _ => (term, None),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| RuntimeError::syntax(format!("bad interval '{term}'")))?;
    let scale = match unit {
        None | Some('s') => 1.0,
        Some('m') => 60.0,
        Some('h') => 3600.0,
        Some('d') => 86400.0,
        Some('w') => 604800.0,
        Some(other) => {
            return Err(RuntimeError::syntax(format!(
                "unknown interval unit '{other}'"
            )));
        }
    };
    Ok(value * scale)
}

#[cfg(test)]
#[path = "stmt_tests.rs"]
mod tests;
