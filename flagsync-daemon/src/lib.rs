//! Daemon runtime: debounced change coalescing + env-file sync
//! orchestration.

pub mod debounce;
mod error;
mod runtime;

pub use debounce::Debouncer;
pub use error::DaemonError;
pub use runtime::{start_blocking, Daemon, DaemonHandle, DaemonState};
