// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern matching against event tokens.
//!
//! A pattern is a sequence of literal tokens and wildcards. `*` consumes
//! exactly one token and binds it to the next positional index (`"1"`,
//! `"2"`, …); `*NAME` consumes exactly one token and binds it to `NAME`;
//! a literal must equal the event token exactly. Pattern and event must
//! exhaust together.

use hearth_core::{Context, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    /// `None` is a positional wildcard, `Some(name)` a named one.
    Wildcard(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    parts: Vec<Part>,
}

impl Pattern {
    pub fn parse(tokens: &[String]) -> Self {
        let parts = tokens
            .iter()
            .map(|tok| {
                if tok == "*" {
                    Part::Wildcard(None)
                } else if let Some(name) = tok.strip_prefix('*') {
                    Part::Wildcard(Some(name.to_string()))
                } else {
                    Part::Literal(tok.clone())
                }
            })
            .collect();
        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The leading token if it is a literal.
    pub fn first_literal(&self) -> Option<&str> {
        match self.parts.first() {
            Some(Part::Literal(lit)) => Some(lit),
            _ => None,
        }
    }

    pub fn matches(&self, tokens: &[String]) -> bool {
        self.captures(tokens).is_some()
    }

    /// Walk pattern and tokens in lockstep, returning the captured
    /// `(key, value)` pairs, or `None` when the match fails.
    pub fn captures(&self, tokens: &[String]) -> Option<Vec<(String, String)>> {
        if tokens.len() != self.parts.len() {
            return None;
        }
        let mut caps = Vec::new();
        let mut pos = 0usize;
        for (part, tok) in self.parts.iter().zip(tokens) {
            match part {
                Part::Literal(lit) => {
                    if lit != tok {
                        return None;
                    }
                }
                Part::Wildcard(None) => {
                    pos += 1;
                    caps.push((pos.to_string(), tok.clone()));
                }
                Part::Wildcard(Some(name)) => caps.push((name.clone(), tok.clone())),
            }
        }
        Some(caps)
    }

    /// Bind captures into a context. Count disagreement raises
    /// `BadArgCount`; a literal mismatch raises `BadArgs`.
    pub fn bind(&self, tokens: &[String], ctx: &Context) -> Result<(), RuntimeError> {
        if tokens.len() != self.parts.len() {
            return Err(RuntimeError::BadArgCount);
        }
        let mut pos = 0usize;
        for (part, tok) in self.parts.iter().zip(tokens) {
            match part {
                Part::Literal(lit) => {
                    if lit != tok {
                        return Err(RuntimeError::BadArgs {
                            expected: lit.clone(),
                            got: tok.clone(),
                        });
                    }
                }
                Part::Wildcard(None) => {
                    pos += 1;
                    ctx.set(pos.to_string(), tok.as_str());
                }
                Part::Wildcard(Some(name)) => ctx.set(name.clone(), tok.as_str()),
            }
        }
        Ok(())
    }

    /// Source-form label, e.g. `switch *state livingroom *sw`.
    pub fn label(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(lit) => lit.clone(),
                Part::Wildcard(None) => "*".to_string(),
                Part::Wildcard(Some(name)) => format!("*{name}"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
