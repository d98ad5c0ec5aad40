//! Behavioral specifications for the hearth runtime.
//!
//! These tests drive the public surface end to end: scripts go through the
//! tokenizer and builder, events through the dispatcher, and adapters
//! through real child processes. CLI checks invoke the hearthd binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/adapter.rs"]
mod adapter;
#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/dispatch.rs"]
mod dispatch;
#[path = "specs/try_catch.rs"]
mod try_catch;
#[path = "specs/wait.rs"]
mod wait;
#[path = "specs/wildcard.rs"]
mod wildcard;
