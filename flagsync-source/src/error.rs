//! Error types for flagsync-source.

use flagsync_core::types::FlagKey;
use thiserror::Error;

/// All errors a flag-source connection can report.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Evaluation of a single flag failed; the caller falls back.
    #[error("evaluation of flag '{key}' failed: {reason}")]
    Evaluation { key: FlagKey, reason: String },

    /// Change-watch registration for a single flag failed.
    #[error("watch registration for flag '{key}' failed: {reason}")]
    Watch { key: FlagKey, reason: String },

    /// The connection has been closed.
    #[error("flag source connection is closed")]
    Closed,
}
