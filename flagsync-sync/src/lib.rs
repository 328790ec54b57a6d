//! # flagsync-sync
//!
//! The evaluation + persistence pipeline.
//!
//! Call [`pipeline::run_cycle`] to evaluate every tracked key against
//! the flag source and persist the resulting snapshot into the env
//! file with an atomic, backup-preserving write.

pub mod envfile;
pub mod error;
pub mod evaluator;
pub mod pipeline;

pub use envfile::{persist, WriteResult};
pub use error::SyncError;
pub use evaluator::snapshot;
