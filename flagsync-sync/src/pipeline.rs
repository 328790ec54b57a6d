//! One evaluation + persist cycle.
//!
//! Canonical writer path shared by the daemon's initial sync and the
//! debounced action; nothing else writes the env file.

use flagsync_core::config::Config;
use flagsync_source::Connection;

use crate::envfile::{self, WriteResult};
use crate::error::SyncError;
use crate::evaluator;

/// Evaluate all tracked keys and persist the snapshot.
///
/// An unready source still produces a best-effort snapshot; persisting
/// fallback values is deliberate — downstream consumers need *a* value
/// rather than a stale file silently diverging.
pub fn run_cycle(conn: &dyn Connection, config: &Config) -> Result<WriteResult, SyncError> {
    if !conn.is_ready() {
        tracing::warn!("flag source not ready; persisting best-effort fallback values");
    }
    let snapshot = evaluator::snapshot(conn, &config.tracked_keys, &config.context);
    envfile::persist(&config.env_file, &snapshot, config.backup_enabled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
