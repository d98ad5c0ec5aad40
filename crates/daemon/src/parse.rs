// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenizer for the configuration language.
//!
//! Block structure is indentation-or-colon: a trailing `:` opens a child
//! block, whose statements are indented further. `#` starts a comment,
//! double quotes group a token with spaces, and tabs count to the next
//! multiple of eight. The output is the [`ScriptItem`] stream the builder
//! consumes; this module knows nothing about statement meanings.

use hearth_core::{RuntimeError, ScriptItem, SourceLocation};

/// Turn one source file into a balanced statement stream.
pub fn script_items(source: &str, file: &str) -> Result<Vec<ScriptItem>, RuntimeError> {
    let mut items = Vec::new();
    let mut stack: Vec<usize> = vec![0];
    let mut pending_open = false;

    for (idx, raw) in source.lines().enumerate() {
        let location = SourceLocation::new(file, idx as u32 + 1);
        let (indent, rest) = measure_indent(raw);
        let tokens = tokenize(rest, &location)?;
        if tokens.is_empty() {
            continue;
        }

        let current = *stack.last().unwrap_or(&0);
        if pending_open {
            if indent <= current {
                return Err(RuntimeError::syntax(format!(
                    "{location}: expected an indented block"
                )));
            }
            stack.push(indent);
            pending_open = false;
        } else if indent > current {
            return Err(RuntimeError::syntax(format!(
                "{location}: unexpected indent"
            )));
        } else {
            while indent < *stack.last().unwrap_or(&0) {
                stack.pop();
                items.push(ScriptItem::BlockClose);
            }
            if indent != *stack.last().unwrap_or(&0) {
                return Err(RuntimeError::syntax(format!(
                    "{location}: unindent does not match any outer level"
                )));
            }
        }

        let (tokens, opens_block) = strip_block_colon(tokens);
        if opens_block {
            if tokens.is_empty() {
                return Err(RuntimeError::syntax(format!(
                    "{location}: a block needs a statement before the colon"
                )));
            }
            items.push(ScriptItem::BlockOpen { tokens, location });
            pending_open = true;
        } else {
            items.push(ScriptItem::Statement { tokens, location });
        }
    }

    if pending_open {
        return Err(RuntimeError::syntax(format!(
            "{file}: expected an indented block at end of input"
        )));
    }
    while stack.len() > 1 {
        stack.pop();
        items.push(ScriptItem::BlockClose);
    }
    Ok(items)
}

/// Leading whitespace width (tabs advance to the next multiple of 8) and
/// the rest of the line.
fn measure_indent(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (pos, ch) in line.char_indices() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => return (width, &line[pos..]),
        }
    }
    (width, "")
}

/// Split a line into tokens: whitespace-separated words, double-quoted
/// strings as single tokens, `#` starting a comment.
fn tokenize(line: &str, location: &SourceLocation) -> Result<Vec<String>, RuntimeError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if ch == '#' {
            break;
        }
        if ch == '"' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == '"' {
                    closed = true;
                    break;
                }
                token.push(next);
            }
            if !closed {
                return Err(RuntimeError::syntax(format!(
                    "{location}: unterminated string"
                )));
            }
            tokens.push(token);
            continue;
        }
        let mut token = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_whitespace() {
                break;
            }
            token.push(next);
            chars.next();
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// Detect the block-opening colon: either a standalone `:` token or a
/// colon glued to the last token. Attribute markers (`:name`) stay put.
fn strip_block_colon(mut tokens: Vec<String>) -> (Vec<String>, bool) {
    match tokens.last().map(String::as_str) {
        Some(":") => {
            tokens.pop();
            (tokens, true)
        }
        Some(last) if last.len() > 1 && last.ends_with(':') && !last.starts_with(':') => {
            let trimmed = last[..last.len() - 1].to_string();
            tokens.pop();
            tokens.push(trimmed);
            (tokens, true)
        }
        _ => (tokens, false),
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
