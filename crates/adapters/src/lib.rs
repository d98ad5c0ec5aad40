// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-adapters: connection supervisor for TCP endpoints and external
//! device adapter processes.
//!
//! Everything here runs as spawned tasks that report back to the dispatcher
//! exclusively through status events; no error escapes to a dispatch caller.

pub mod events;
pub mod net;
pub mod process;
pub mod wire;

pub use events::EventTx;
pub use net::{NetConfig, NetHandle, NetKind};
pub use process::{AdapterConfig, AdapterHandle, AdapterKind};
