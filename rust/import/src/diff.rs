// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diff-based incremental import
//!
//! A diff snapshot lists the `GlobalId`s added, changed or deleted since a
//! previous import:
//!
//! ```json
//! {"added": ["2O2Fr$t4X7Zf8NOew3FLOH"], "deleted": [], "changed": {"1kTvXnbbzCWw8lcMd1dR4o": {}}}
//! ```
//!
//! Changed entries map to the prior state, which the importer does not read.

use crate::error::{ImportError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Added, changed and deleted global ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSnapshot {
    pub added: FxHashSet<String>,
    pub deleted: FxHashSet<String>,
    pub changed: FxHashMap<String, serde_json::Value>,
}

impl DiffSnapshot {
    /// Parse a JSON snapshot; missing keys are empty
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Decides which entities to (re)materialize and which scene objects to purge
#[derive(Debug, Clone, Default)]
pub struct DiffFilter {
    snapshot: Option<DiffSnapshot>,
}

impl DiffFilter {
    /// A filter letting everything through
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DiffSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// Load the snapshot at `path`
    ///
    /// No path, or a path that does not exist, disables the filter. A file
    /// that cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Diff snapshot not found, importing everything");
            return Ok(Self::disabled());
        }

        let json = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = DiffSnapshot::from_json(&json).map_err(|source| ImportError::MalformedDiff {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            added = snapshot.added.len(),
            changed = snapshot.changed.len(),
            deleted = snapshot.deleted.len(),
            "Loaded diff snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn is_active(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Whether an entity with this global id should be created
    ///
    /// Entities without a global id are never selected by an active diff.
    pub fn should_materialize(&self, global_id: Option<&str>) -> bool {
        match &self.snapshot {
            None => true,
            Some(snapshot) => global_id.is_some_and(|id| {
                snapshot.added.contains(id) || snapshot.changed.contains_key(id)
            }),
        }
    }

    /// Whether an existing scene object recorded with this global id should be removed
    pub fn should_purge(&self, global_id: &str) -> bool {
        match &self.snapshot {
            None => false,
            Some(snapshot) => {
                snapshot.deleted.contains(global_id) || snapshot.changed.contains_key(global_id)
            }
        }
    }
}
