//! Environment-derived daemon configuration.
//!
//! # API pattern
//!
//! - [`Config::from_vars`] — explicit lookup function; used in tests
//! - [`Config::from_env`] — reads the process environment, delegates
//!
//! Tests must never call `from_env`; always inject a lookup.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{EvalContext, TrackedKeys};

const DEFAULT_FLAGS: &str = "SAMPLE_API_URL,SAMPLE_SERVICE_URL,SAMPLE_APP_URL";
const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_DEBOUNCE_MS: u64 = 400;
const DEFAULT_CONTEXT_KEY: &str = "flagsync-daemon";
const DEFAULT_CONTEXT_NAME: &str = "Daemon";

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Credential for the remote flag source. May be blank here;
    /// [`Config::require_credential`] enforces presence before startup.
    pub sdk_key: String,
    pub tracked_keys: TrackedKeys,
    pub env_file: PathBuf,
    pub backup_enabled: bool,
    pub log_level: String,
    pub debounce_ms: u64,
    pub context: EvalContext,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sdk_key = lookup("FLAGSYNC_SDK_KEY").unwrap_or_default().trim().to_string();

        let flags = lookup("FLAGSYNC_FLAGS").unwrap_or_else(|| DEFAULT_FLAGS.to_string());
        let tracked_keys = TrackedKeys::parse(&flags);

        let env_file = lookup("FLAGSYNC_ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));

        let backup_enabled = lookup("FLAGSYNC_BACKUP")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let log_level = lookup("FLAGSYNC_LOG")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let debounce_ms = match lookup("FLAGSYNC_DEBOUNCE_MS") {
            Some(raw) => {
                let raw = raw.trim().to_string();
                raw.parse::<u64>().map_err(|source| ConfigError::InvalidDebounce {
                    value: raw,
                    source,
                })?
            }
            None => DEFAULT_DEBOUNCE_MS,
        };

        let context = EvalContext::new(
            lookup("FLAGSYNC_CONTEXT_KEY").unwrap_or_else(|| DEFAULT_CONTEXT_KEY.to_string()),
            lookup("FLAGSYNC_CONTEXT_NAME").unwrap_or_else(|| DEFAULT_CONTEXT_NAME.to_string()),
        );

        Ok(Self {
            sdk_key,
            tracked_keys,
            env_file,
            backup_enabled,
            log_level,
            debounce_ms,
            context,
        })
    }

    /// Fail-fast credential check; must pass before any connection attempt.
    pub fn require_credential(&self) -> Result<(), ConfigError> {
        if self.sdk_key.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(())
    }

    /// The debounce quiet interval.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
