// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compile the parsed statement stream into statement trees.
//!
//! This is where the parse-time rules live: `catch` attaches to the
//! preceding `try`, the `prio`/`name`/`doc` modifiers apply to their
//! enclosing `on` block, wait attributes are split off the statement line,
//! and unknown leading words fail with `UnknownWord`.

use crate::registry::{DEFAULT_ON_PRIO, MAX_PRIO, MIN_PRIO};
use crate::stmt::{AdapterDef, CatchClause, OnDef, Stmt, WaitDef};
use hearth_adapters::AdapterKind;
use hearth_core::{LogLevel, RuntimeError, ScriptItem, SourceLocation};
use std::sync::Arc;

/// Compile a balanced item stream into a statement list.
pub fn compile(items: &[ScriptItem]) -> Result<Vec<Stmt>, RuntimeError> {
    let mut cursor = Cursor { items, pos: 0 };
    compile_block(&mut cursor, false)
}

struct Cursor<'a> {
    items: &'a [ScriptItem],
    pos: usize,
}

impl Cursor<'_> {
    fn next(&mut self) -> Option<ScriptItem> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

fn compile_block(cursor: &mut Cursor<'_>, nested: bool) -> Result<Vec<Stmt>, RuntimeError> {
    let mut stmts = Vec::new();
    loop {
        let Some(item) = cursor.next() else {
            if nested {
                return Err(RuntimeError::syntax("unexpected end of input in a block"));
            }
            return Ok(stmts);
        };
        match item {
            ScriptItem::BlockClose => {
                if nested {
                    return Ok(stmts);
                }
                return Err(RuntimeError::syntax("unbalanced end of block"));
            }
            ScriptItem::Statement { tokens, location } => {
                stmts.push(compile_simple(&tokens, &location)?);
            }
            ScriptItem::BlockOpen { tokens, location } => {
                compile_complex(cursor, &tokens, &location, &mut stmts)?;
            }
        }
    }
}

fn compile_complex(
    cursor: &mut Cursor<'_>,
    tokens: &[String],
    location: &SourceLocation,
    stmts: &mut Vec<Stmt>,
) -> Result<(), RuntimeError> {
    let Some(head) = tokens.first() else {
        return Err(RuntimeError::syntax(format!("{location}: empty statement")));
    };
    match head.as_str() {
        "on" => {
            let def = compile_on(cursor, tokens, location)?;
            stmts.push(Stmt::On(def));
        }
        "try" => {
            if tokens.len() != 1 {
                return Err(RuntimeError::syntax(format!("{location}: usage: try:")));
            }
            let body = compile_block(cursor, true)?;
            stmts.push(Stmt::Try {
                body,
                catches: Vec::new(),
            });
        }
        "catch" => {
            let body = compile_block(cursor, true)?;
            let clause = CatchClause {
                filter: tokens[1..].to_vec(),
                body,
            };
            match stmts.last_mut() {
                Some(Stmt::Try { catches, .. }) => catches.push(clause),
                _ => {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: catch without a preceding try"
                    )));
                }
            }
        }
        "block" => {
            if tokens.len() != 1 {
                return Err(RuntimeError::syntax(format!("{location}: usage: block:")));
            }
            stmts.push(Stmt::Block(compile_block(cursor, true)?));
        }
        "adapter" => {
            stmts.push(compile_adapter(cursor, tokens, location)?);
        }
        "trigger" | "log" | "skip" | "del" | "wait" | "net" | "listen" | "send" | "list"
        | "shutdown" => {
            return Err(RuntimeError::syntax(format!(
                "{location}: '{head}' does not open a block"
            )));
        }
        _ => {
            return Err(RuntimeError::UnknownWord {
                word: head.clone(),
                location: location.clone(),
            });
        }
    }
    Ok(())
}

/// Compile an `on …:` block, applying the immediate modifiers
/// (`prio`, `name`, `doc`) to the handler definition.
fn compile_on(
    cursor: &mut Cursor<'_>,
    tokens: &[String],
    location: &SourceLocation,
) -> Result<OnDef, RuntimeError> {
    let pattern = &tokens[1..];
    if pattern.is_empty() {
        return Err(RuntimeError::syntax(format!(
            "{location}: usage: on \u{2039}event\u{2026}\u{203a}:"
        )));
    }

    let mut prio = DEFAULT_ON_PRIO;
    let mut name = None;
    let mut doc = None;
    let mut body = Vec::new();

    loop {
        let Some(item) = cursor.next() else {
            return Err(RuntimeError::syntax(format!(
                "{location}: unexpected end of input in 'on' block"
            )));
        };
        match item {
            ScriptItem::BlockClose => break,
            ScriptItem::Statement { tokens, location } => match tokens.first().map(String::as_str) {
                Some("prio") => {
                    if tokens.len() != 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: prio \u{2039}priority\u{203a}"
                        )));
                    }
                    let value: i32 = tokens[1].parse().map_err(|_| {
                        RuntimeError::syntax(format!("{location}: integer priorities only"))
                    })?;
                    if !(MIN_PRIO..=MAX_PRIO).contains(&value) {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: priority {value} outside {MIN_PRIO}..{MAX_PRIO}"
                        )));
                    }
                    prio = value;
                }
                Some("name") => {
                    if tokens.len() != 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: name \"\u{2039}text\u{203a}\""
                        )));
                    }
                    name = Some(tokens[1].clone());
                }
                Some("doc") => {
                    if tokens.len() != 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: doc \"\u{2039}text\u{203a}\""
                        )));
                    }
                    doc = Some(tokens[1].clone());
                }
                _ => body.push(compile_simple(&tokens, &location)?),
            },
            ScriptItem::BlockOpen { tokens, location } => {
                compile_complex(cursor, &tokens, &location, &mut body)?;
            }
        }
    }

    if body.is_empty() {
        return Err(RuntimeError::syntax(format!(
            "{location}: 'on' needs at least one statement"
        )));
    }
    Ok(OnDef {
        pattern: pattern.to_vec(),
        prio,
        name,
        doc,
        body: Arc::new(body),
    })
}

fn compile_adapter(
    cursor: &mut Cursor<'_>,
    tokens: &[String],
    location: &SourceLocation,
) -> Result<Stmt, RuntimeError> {
    let kind = match tokens.get(1).map(String::as_str) {
        Some("receiver") => AdapterKind::Receiver,
        Some("sender") => AdapterKind::Sender,
        _ => {
            return Err(RuntimeError::syntax(format!(
                "{location}: usage: adapter receiver|sender \u{2039}name\u{2026}\u{203a}:"
            )));
        }
    };
    let name = tokens[2..].to_vec();
    if name.is_empty() {
        return Err(RuntimeError::syntax(format!(
            "{location}: adapter needs a name"
        )));
    }

    let mut cmd = None;
    let mut timeout = None;
    let mut prefixes = None;

    loop {
        let Some(item) = cursor.next() else {
            return Err(RuntimeError::syntax(format!(
                "{location}: unexpected end of input in 'adapter' block"
            )));
        };
        match item {
            ScriptItem::BlockClose => break,
            ScriptItem::BlockOpen { location, .. } => {
                return Err(RuntimeError::syntax(format!(
                    "{location}: adapter sub-statements do not open blocks"
                )));
            }
            ScriptItem::Statement { tokens, location } => match tokens.first().map(String::as_str) {
                Some("cmd") => {
                    if tokens.len() < 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: cmd \u{2039}command\u{2026}\u{203a}"
                        )));
                    }
                    cmd = Some(tokens[1..].to_vec());
                }
                Some("timeout") => {
                    if tokens.len() != 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: timeout \u{2039}seconds\u{203a}"
                        )));
                    }
                    let seconds: f64 = tokens[1].parse().map_err(|_| {
                        RuntimeError::syntax(format!("{location}: bad timeout value"))
                    })?;
                    timeout = Some(seconds);
                }
                Some("prefixes") => {
                    if tokens.len() != 2 {
                        return Err(RuntimeError::syntax(format!(
                            "{location}: usage: prefixes \u{2039}chars\u{203a}"
                        )));
                    }
                    prefixes = Some(tokens[1].clone());
                }
                other => {
                    return Err(RuntimeError::UnknownWord {
                        word: other.unwrap_or_default().to_string(),
                        location: location.clone(),
                    });
                }
            },
        }
    }

    let Some(cmd) = cmd else {
        return Err(RuntimeError::syntax(format!(
            "{location}: adapter requires a 'cmd' sub-statement"
        )));
    };
    Ok(Stmt::Adapter(AdapterDef {
        kind,
        name,
        cmd,
        timeout,
        prefixes,
    }))
}

fn compile_simple(tokens: &[String], location: &SourceLocation) -> Result<Stmt, RuntimeError> {
    let Some(head) = tokens.first() else {
        return Err(RuntimeError::syntax(format!("{location}: empty statement")));
    };
    match head.as_str() {
        "trigger" => {
            if tokens.get(1).map(String::as_str) == Some("error") {
                let params = tokens[2..].to_vec();
                if params.is_empty() {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: usage: trigger error NAME\u{2026}"
                    )));
                }
                Ok(Stmt::TriggerError { params })
            } else {
                let rest = tokens[1..].to_vec();
                if rest.is_empty() {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: events need at least one name token"
                    )));
                }
                Ok(Stmt::Trigger { tokens: rest })
            }
        }
        "log" => compile_log(tokens, location),
        "skip" => {
            if tokens.len() == 2 && tokens[1] == "next" {
                Ok(Stmt::SkipNext)
            } else {
                Err(RuntimeError::syntax(format!(
                    "{location}: usage: skip next"
                )))
            }
        }
        "wait" => compile_wait(tokens, location),
        "del" => compile_del(tokens, location),
        "net" => {
            let (name, host, port) = endpoint_args(&tokens[1..], location)?;
            Ok(Stmt::NetConnect { name, host, port })
        }
        "listen" => {
            if tokens.get(1).map(String::as_str) != Some("net") {
                return Err(RuntimeError::UnknownWord {
                    word: tokens.get(1).cloned().unwrap_or_default(),
                    location: location.clone(),
                });
            }
            let (name, host, port) = endpoint_args(&tokens[2..], location)?;
            Ok(Stmt::NetListen { name, host, port })
        }
        "send" => compile_send(tokens, location),
        "list" => Ok(Stmt::List {
            path: tokens[1..].to_vec(),
        }),
        "shutdown" => {
            if tokens.len() == 1 {
                Ok(Stmt::Shutdown)
            } else {
                Err(RuntimeError::syntax(format!(
                    "{location}: usage: shutdown"
                )))
            }
        }
        "on" | "try" | "catch" | "block" | "adapter" => Err(RuntimeError::syntax(format!(
            "{location}: '{head}' needs a block"
        ))),
        _ => Err(RuntimeError::UnknownWord {
            word: head.clone(),
            location: location.clone(),
        }),
    }
}

fn compile_log(tokens: &[String], location: &SourceLocation) -> Result<Stmt, RuntimeError> {
    if tokens.get(1).map(String::as_str) == Some("error") {
        if tokens.len() == 2 {
            return Ok(Stmt::LogError {
                level: None,
                message: Vec::new(),
            });
        }
        let level = LogLevel::parse(&tokens[2]).ok_or_else(|| {
            RuntimeError::syntax(format!("{location}: unknown severity '{}'", tokens[2]))
        })?;
        return Ok(Stmt::LogError {
            level: Some(level),
            message: tokens[3..].to_vec(),
        });
    }
    let level = tokens
        .get(1)
        .and_then(|t| LogLevel::parse(t))
        .ok_or_else(|| {
            RuntimeError::syntax(format!("{location}: usage: log LEVEL text\u{2026}"))
        })?;
    let message = tokens[2..].to_vec();
    if message.is_empty() {
        return Err(RuntimeError::syntax(format!(
            "{location}: usage: log LEVEL text\u{2026}"
        )));
    }
    Ok(Stmt::Log { level, message })
}

fn compile_wait(tokens: &[String], location: &SourceLocation) -> Result<Stmt, RuntimeError> {
    let (duration, attrs) = split_attrs(&tokens[1..]);
    if duration.is_empty() {
        return Err(RuntimeError::syntax(format!(
            "{location}: usage: wait \u{2039}interval\u{203a} [:name \u{2039}name\u{2026}\u{203a}] [:update]"
        )));
    }
    let mut name = None;
    let mut update = false;
    for (key, args) in attrs {
        match key.as_str() {
            "name" => {
                if args.is_empty() {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: usage: :name \u{2039}name\u{2026}\u{203a}"
                    )));
                }
                name = Some(args);
            }
            "update" => {
                if !args.is_empty() {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: :update takes no arguments"
                    )));
                }
                update = true;
            }
            other => {
                return Err(RuntimeError::syntax(format!(
                    "{location}: unknown wait attribute ':{other}'"
                )));
            }
        }
    }
    if update && name.is_none() {
        return Err(RuntimeError::syntax(format!(
            "{location}: :update needs a :name"
        )));
    }
    Ok(Stmt::Wait(WaitDef {
        duration,
        name,
        update,
    }))
}

fn compile_del(tokens: &[String], location: &SourceLocation) -> Result<Stmt, RuntimeError> {
    match tokens.get(1).map(String::as_str) {
        Some("on") => {
            if tokens.len() != 3 {
                return Err(RuntimeError::syntax(format!(
                    "{location}: usage: del on \u{2039}id-or-name\u{203a}"
                )));
            }
            Ok(Stmt::DelOn {
                target: tokens[2].clone(),
            })
        }
        Some("wait") => {
            let name = tokens[2..].to_vec();
            if name.is_empty() {
                return Err(RuntimeError::syntax(format!(
                    "{location}: usage: del wait \u{2039}name\u{2026}\u{203a}"
                )));
            }
            Ok(Stmt::DelWait { name })
        }
        Some("net") => {
            let name = tokens[2..].to_vec();
            if name.is_empty() {
                return Err(RuntimeError::syntax(format!(
                    "{location}: usage: del net \u{2039}name\u{2026}\u{203a}"
                )));
            }
            Ok(Stmt::DelNet { name })
        }
        Some("adapter") => {
            let kind = match tokens.get(2).map(String::as_str) {
                Some("receiver") => AdapterKind::Receiver,
                Some("sender") => AdapterKind::Sender,
                _ => {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: usage: del adapter receiver|sender \u{2039}name\u{2026}\u{203a}"
                    )));
                }
            };
            let name = tokens[3..].to_vec();
            if name.is_empty() {
                return Err(RuntimeError::syntax(format!(
                    "{location}: adapter needs a name"
                )));
            }
            Ok(Stmt::DelAdapter { kind, name })
        }
        Some(other) => Err(RuntimeError::UnknownWord {
            word: other.to_string(),
            location: location.clone(),
        }),
        None => Err(RuntimeError::syntax(format!(
            "{location}: usage: del on|wait|net|adapter \u{2026}"
        ))),
    }
}

fn compile_send(tokens: &[String], location: &SourceLocation) -> Result<Stmt, RuntimeError> {
    match tokens.get(1).map(String::as_str) {
        Some("net") => {
            let (base, attrs) = split_attrs(&tokens[2..]);
            if let Some(args) = attr(&attrs, "to") {
                if base.is_empty() {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: usage: send net text\u{2026} :to \u{2039}name\u{2026}\u{203a}"
                    )));
                }
                return Ok(Stmt::NetSend {
                    name: args,
                    text: base,
                });
            }
            if base.len() < 2 {
                return Err(RuntimeError::syntax(format!(
                    "{location}: usage: send net \u{2039}name\u{203a} text\u{2026}"
                )));
            }
            Ok(Stmt::NetSend {
                name: vec![base[0].clone()],
                text: base[1..].to_vec(),
            })
        }
        Some("adapter") => {
            let (base, attrs) = split_attrs(&tokens[2..]);
            if let Some(args) = attr(&attrs, "to") {
                if base.len() != 2 {
                    return Err(RuntimeError::syntax(format!(
                        "{location}: usage: send adapter PREFIX HEX :to \u{2039}name\u{2026}\u{203a}"
                    )));
                }
                return Ok(Stmt::AdapterSend {
                    name: args,
                    prefix: base[0].clone(),
                    hex: base[1].clone(),
                });
            }
            if base.len() != 3 {
                return Err(RuntimeError::syntax(format!(
                    "{location}: usage: send adapter \u{2039}name\u{203a} PREFIX HEX"
                )));
            }
            Ok(Stmt::AdapterSend {
                name: vec![base[0].clone()],
                prefix: base[1].clone(),
                hex: base[2].clone(),
            })
        }
        Some(other) => Err(RuntimeError::UnknownWord {
            word: other.to_string(),
            location: location.clone(),
        }),
        None => Err(RuntimeError::syntax(format!(
            "{location}: usage: send net|adapter \u{2026}"
        ))),
    }
}

/// `NAME [HOST] PORT` or `[HOST] PORT :name NAME…`.
fn endpoint_args(
    tokens: &[String],
    location: &SourceLocation,
) -> Result<(Vec<String>, Option<String>, String), RuntimeError> {
    let (base, attrs) = split_attrs(tokens);
    let usage = || {
        RuntimeError::syntax(format!(
            "{location}: usage: \u{2039}name\u{203a} [host] port"
        ))
    };
    if let Some(name) = attr(&attrs, "name") {
        return match base.as_slice() {
            [port] => Ok((name, None, port.clone())),
            [host, port] => Ok((name, Some(host.clone()), port.clone())),
            _ => Err(usage()),
        };
    }
    match base.as_slice() {
        [name, port] => Ok((vec![name.clone()], None, port.clone())),
        [name, host, port] => Ok((vec![name.clone()], Some(host.clone()), port.clone())),
        _ => Err(usage()),
    }
}

/// Split `:key args…` attribute groups off a token list.
fn split_attrs(tokens: &[String]) -> (Vec<String>, Vec<(String, Vec<String>)>) {
    let mut base = Vec::new();
    let mut attrs: Vec<(String, Vec<String>)> = Vec::new();
    for token in tokens {
        if let Some(key) = token.strip_prefix(':') {
            if !key.is_empty() {
                attrs.push((key.to_string(), Vec::new()));
                continue;
            }
        }
        match attrs.last_mut() {
            Some((_, args)) => args.push(token.clone()),
            None => base.push(token.clone()),
        }
    }
    (base, attrs)
}

fn attr(attrs: &[(String, Vec<String>)], key: &str) -> Option<Vec<String>> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, args)| args.clone())
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
