//! Flagsync core library — domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and value types shared across the workspace
//! - [`config`] — environment-derived [`Config`]
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{EvalContext, FlagKey, Snapshot, TrackedKeys};
