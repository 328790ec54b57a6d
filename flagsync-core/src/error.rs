//! Error types for flagsync-core.

use thiserror::Error;

/// All errors that can arise while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential is missing or blank. Fatal before startup.
    #[error("FLAGSYNC_SDK_KEY is required; set it in the environment and retry")]
    MissingCredential,

    /// `FLAGSYNC_DEBOUNCE_MS` did not parse as milliseconds.
    #[error("invalid FLAGSYNC_DEBOUNCE_MS value '{value}': {source}")]
    InvalidDebounce {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
