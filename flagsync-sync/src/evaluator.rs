//! Per-key flag evaluation with fallback isolation.

use flagsync_core::types::{EvalContext, Snapshot, TrackedKeys};
use flagsync_source::Connection;

/// Value used when a key is unknown, mistyped, or its evaluation fails.
pub const FALLBACK: &str = "";

/// Evaluate every tracked key under `context` and build a [`Snapshot`].
///
/// A failing key yields [`FALLBACK`] for that key and a logged warning;
/// it never aborts evaluation of the remaining keys, so the snapshot
/// always has exactly one entry per tracked key, in tracked order.
pub fn snapshot(conn: &dyn Connection, keys: &TrackedKeys, context: &EvalContext) -> Snapshot {
    let mut snap = Snapshot::with_capacity(keys.len());
    for key in keys.iter() {
        let value = match conn.evaluate(key, context, FALLBACK) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "flag evaluation failed; using fallback");
                FALLBACK.to_string()
            }
        };
        snap.push(key.clone(), value);
    }
    snap
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
