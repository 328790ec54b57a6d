//! The [`Connection`] trait — what the daemon expects from a remote
//! flag source.

use flagsync_core::types::{EvalContext, FlagKey};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::SourceError;

/// A change notification for one tracked flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    pub key: FlagKey,
}

/// An open connection to a flag-evaluation source.
///
/// Implementations deliver change notifications on their own tasks or
/// threads; callers must not assume notifications are serialized with
/// each other or with the control flow that registered them.
pub trait Connection: Send + Sync {
    /// Whether the source has finished its initial data load.
    ///
    /// Readiness is a best-effort optimization: evaluation must already
    /// tolerate an unready source by returning fallbacks.
    fn is_ready(&self) -> bool;

    /// Evaluate `key` under `context`.
    ///
    /// Must not block indefinitely. An unknown or mistyped key resolves
    /// to `fallback`; an `Err` is reserved for evaluation failures the
    /// source itself reports.
    fn evaluate(
        &self,
        key: &FlagKey,
        context: &EvalContext,
        fallback: &str,
    ) -> Result<String, SourceError>;

    /// Register interest in value changes for `key` under `context`.
    ///
    /// Every time the evaluated value changes, the source sends one
    /// [`FlagChange`] on `notify`. Registration failures affect only
    /// this key.
    fn watch(
        &self,
        key: &FlagKey,
        context: &EvalContext,
        notify: UnboundedSender<FlagChange>,
    ) -> Result<(), SourceError>;

    /// Release remote resources. Idempotent.
    fn close(&self);
}
