// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load configuration scripts into a runtime.
//!
//! Each file is tokenized, compiled, and its top-level statements executed
//! in order against a fresh context. `SIGHUP` re-runs the same sequence.

use crate::parse;
use hearth_core::{Context, RuntimeError};
use hearth_engine::Runtime;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Execute one script file.
pub async fn run_file(rt: &Arc<Runtime>, path: &Path) -> Result<(), RuntimeError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| RuntimeError::syntax(format!("cannot read {}: {e}", path.display())))?;
    let items = parse::script_items(&source, &path.to_string_lossy())?;
    let stmts = hearth_engine::compile(&items)?;

    let ctx = Context::new();
    let cancel = rt.stop_token();
    for stmt in &stmts {
        stmt.exec(rt, &ctx, &cancel).await?;
    }
    Ok(())
}

/// Execute the configured scripts in listed order, stopping at the first
/// failing file.
pub async fn run_scripts(rt: &Arc<Runtime>, paths: &[PathBuf]) -> Result<(), RuntimeError> {
    for path in paths {
        run_file(rt, path).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
