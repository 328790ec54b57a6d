//! # flagsync-source
//!
//! The abstract seam to the remote flag-evaluation source.
//!
//! The daemon never talks to a concrete SDK; it is written against the
//! [`Connection`] trait. [`MemorySource`] is the in-process
//! implementation used by tests and local development; an SDK-backed
//! connection plugs in behind the same trait.

pub mod error;
pub mod memory;
pub mod source;

pub use error::SourceError;
pub use memory::MemorySource;
pub use source::{Connection, FlagChange};
