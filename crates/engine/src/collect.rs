// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named collections: a registry of registries with longest-prefix lookup.
//!
//! Each subsystem owns one collection (`on`, `wait`, `net`,
//! `adapter receiver`, `adapter sender`) and inserts an entry per live
//! object. `resolve` consumes the longest leading tokens that name a
//! collection, then the longest remainder that names an entry. Ownership
//! is explicit: whoever created a collection or entry removes it at
//! teardown; there are no weak references.

use hearth_core::{Name, RuntimeError};
use indexmap::IndexMap;
use std::sync::Arc;

/// An entry that can be enumerated by `list`.
pub trait Collected: Send + Sync {
    /// One-line summary for collection listings.
    fn info(&self) -> Option<String> {
        None
    }

    /// `(field, value)` rows for the detailed listing of one entry.
    fn detail(&self) -> Vec<(String, String)>;
}

/// Result of a path lookup.
pub enum Resolved {
    Collection {
        name: Name,
        entries: Vec<(Name, Arc<dyn Collected>)>,
    },
    Entry {
        name: Name,
        entry: Arc<dyn Collected>,
    },
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolved::Collection { name, entries } => f
                .debug_struct("Collection")
                .field("name", name)
                .field("entries", &entries.iter().map(|(n, _)| n).collect::<Vec<_>>())
                .finish(),
            Resolved::Entry { name, .. } => {
                f.debug_struct("Entry").field("name", name).finish()
            }
        }
    }
}

#[derive(Default)]
struct Collection {
    entries: IndexMap<Name, Arc<dyn Collected>>,
}

/// Process-wide registry of registries (owned by the runtime).
#[derive(Default)]
pub struct Collections {
    map: IndexMap<Name, Collection>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, name: Name) -> Result<(), RuntimeError> {
        if self.map.contains_key(&name) {
            return Err(RuntimeError::syntax(format!(
                "a collection \u{2039}{name}\u{203a} already exists"
            )));
        }
        self.map.insert(name, Collection::default());
        Ok(())
    }

    /// Drop a whole collection; the owning subsystem calls this at unload.
    pub fn remove_collection(&mut self, name: &Name) -> bool {
        self.map.shift_remove(name).is_some()
    }

    pub fn collection_names(&self) -> Vec<Name> {
        self.map.keys().cloned().collect()
    }

    pub fn insert(
        &mut self,
        collection: &Name,
        entry_name: Name,
        entry: Arc<dyn Collected>,
    ) -> Result<(), RuntimeError> {
        let coll = self
            .map
            .get_mut(collection)
            .ok_or_else(|| RuntimeError::NotFound(collection.clone()))?;
        if coll.entries.contains_key(&entry_name) {
            return Err(RuntimeError::syntax(format!(
                "duplicate entry \u{2039}{entry_name}\u{203a} in \u{2039}{collection}\u{203a}"
            )));
        }
        coll.entries.insert(entry_name, entry);
        Ok(())
    }

    pub fn remove(&mut self, collection: &Name, entry_name: &Name) -> Option<Arc<dyn Collected>> {
        self.map
            .get_mut(collection)?
            .entries
            .shift_remove(entry_name)
    }

    /// Resolve a token path: consume the longest prefix naming a
    /// collection, then the longest remainder naming an entry.
    pub fn resolve(&self, tokens: &[String]) -> Result<Resolved, RuntimeError> {
        if tokens.is_empty() {
            return Err(RuntimeError::NotFound(Name::default()));
        }

        let (coll_name, coll, rest) = self
            .longest_collection(tokens)
            .ok_or_else(|| RuntimeError::NotFound(Name::from(tokens)))?;

        if rest.is_empty() {
            return Ok(Resolved::Collection {
                name: coll_name,
                entries: coll
                    .entries
                    .iter()
                    .map(|(n, e)| (n.clone(), Arc::clone(e)))
                    .collect(),
            });
        }

        for n in (1..=rest.len()).rev() {
            let candidate = Name::from(&rest[..n]);
            if let Some(entry) = coll.entries.get(&candidate) {
                if n == rest.len() {
                    return Ok(Resolved::Entry {
                        name: candidate,
                        entry: Arc::clone(entry),
                    });
                }
                // entries have no children to recurse into
                break;
            }
        }
        Err(RuntimeError::NotFound(Name::from(tokens)))
    }

    fn longest_collection<'a>(
        &'a self,
        tokens: &'a [String],
    ) -> Option<(Name, &'a Collection, &'a [String])> {
        for n in (1..=tokens.len()).rev() {
            let candidate = Name::from(&tokens[..n]);
            if let Some(coll) = self.map.get(&candidate) {
                return Some((candidate, coll, &tokens[n..]));
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "collect_tests.rs"]
mod tests;
