//! Domain types for flagsync.
//!
//! The tracked key set and evaluation context are built once at startup
//! and never mutated; snapshots are values rebuilt on every evaluation
//! cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name of a tracked flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagKey(pub String);

impl FlagKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for FlagKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FlagKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Tracked keys
// ---------------------------------------------------------------------------

/// Ordered, de-duplicated set of flag keys the daemon manages.
///
/// Fixed for the daemon's lifetime; supplied at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedKeys(Vec<FlagKey>);

impl TrackedKeys {
    /// Parse a comma-separated key list. Whitespace around entries is
    /// trimmed, empty entries are dropped, and only the first occurrence
    /// of a duplicate key is kept.
    pub fn parse(list: &str) -> Self {
        let mut keys: Vec<FlagKey> = Vec::new();
        for part in list.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if keys.iter().any(|k| k.as_str() == part) {
                continue;
            }
            keys.push(FlagKey::from(part));
        }
        Self(keys)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlagKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluation context
// ---------------------------------------------------------------------------

/// The identity presented to the remote source for every evaluation.
///
/// Opaque to the daemon; constant for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalContext {
    pub key: String,
    pub name: String,
}

impl EvalContext {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Current values for every tracked key at one evaluation instant.
///
/// Entries keep tracked-key order. A snapshot is a value: it has no
/// identity beyond its contents and is discarded once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<(FlagKey, String)>,
}

impl Snapshot {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, key: FlagKey, value: String) {
        self.entries.push((key, value));
    }

    /// Value for `key`, if the snapshot tracks it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (FlagKey, String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
