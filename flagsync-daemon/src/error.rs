use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("tokio runtime error: {0}")]
    Runtime(String),

    #[error("flag source error: {0}")]
    Source(#[from] flagsync_source::SourceError),

    #[error("sync error: {0}")]
    Sync(#[from] flagsync_sync::SyncError),
}
