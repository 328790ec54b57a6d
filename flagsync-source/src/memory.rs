//! In-process flag source.
//!
//! Backs the test suites and local development. Values are set
//! programmatically; watchers are notified whenever an evaluated value
//! actually changes. `fail_key` / `fail_watch` simulate per-key source
//! failures so degraded-continue paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use flagsync_core::types::{EvalContext, FlagKey};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::SourceError;
use crate::source::{Connection, FlagChange};

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    failing_eval: HashSet<String>,
    failing_watch: HashSet<String>,
    watchers: HashMap<String, Vec<UnboundedSender<FlagChange>>>,
    ready: bool,
    closed: bool,
}

/// Thread-safe in-memory [`Connection`].
pub struct MemorySource {
    inner: Mutex<Inner>,
}

impl MemorySource {
    /// A ready, empty source: every key evaluates to the fallback until
    /// a value is set.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: true,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data; recover it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the value of `key`, notifying watchers when it changes.
    pub fn set(&self, key: &str, value: &str) {
        let mut inner = self.lock();
        let previous = inner.values.insert(key.to_string(), value.to_string());
        if previous.as_deref() == Some(value) {
            return;
        }
        notify_watchers(&mut inner, key);
    }

    /// Remove `key`; evaluation falls back afterwards.
    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.values.remove(key).is_some() {
            notify_watchers(&mut inner, key);
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    /// Make every evaluation of `key` fail until cleared.
    pub fn fail_key(&self, key: &str) {
        self.lock().failing_eval.insert(key.to_string());
    }

    /// Make watch registration for `key` fail.
    pub fn fail_watch(&self, key: &str) {
        self.lock().failing_watch.insert(key.to_string());
    }

    /// Number of live watch registrations for `key`.
    pub fn watcher_count(&self, key: &str) -> usize {
        self.lock().watchers.get(key).map_or(0, Vec::len)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

fn notify_watchers(inner: &mut Inner, key: &str) {
    if let Some(watchers) = inner.watchers.get_mut(key) {
        // Drop watchers whose receiving side has gone away.
        watchers.retain(|tx| {
            tx.send(FlagChange {
                key: FlagKey::from(key),
            })
            .is_ok()
        });
    }
}

impl Connection for MemorySource {
    fn is_ready(&self) -> bool {
        let inner = self.lock();
        inner.ready && !inner.closed
    }

    fn evaluate(
        &self,
        key: &FlagKey,
        _context: &EvalContext,
        fallback: &str,
    ) -> Result<String, SourceError> {
        let inner = self.lock();
        if inner.closed {
            return Err(SourceError::Closed);
        }
        if inner.failing_eval.contains(key.as_str()) {
            return Err(SourceError::Evaluation {
                key: key.clone(),
                reason: "simulated evaluation failure".to_string(),
            });
        }
        Ok(inner
            .values
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| fallback.to_string()))
    }

    fn watch(
        &self,
        key: &FlagKey,
        _context: &EvalContext,
        notify: UnboundedSender<FlagChange>,
    ) -> Result<(), SourceError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(SourceError::Closed);
        }
        if inner.failing_watch.contains(key.as_str()) {
            return Err(SourceError::Watch {
                key: key.clone(),
                reason: "simulated registration failure".to_string(),
            });
        }
        inner
            .watchers
            .entry(key.as_str().to_string())
            .or_default()
            .push(notify);
        tracing::debug!(key = %key, "registered in-memory watcher");
        Ok(())
    }

    fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.watchers.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
