//! Runtime errors

use thiserror::Error;

use super::future::PayloadKind;
use super::id::FutureId;

/// Runtime result
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors returned by the future store and the scheduler.
///
/// Store errors go back to the calling frame body. A body that propagates
/// one with `?` fails on its own; the rest of the runtime keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Unknown future: {0}")]
    UnknownFuture(FutureId),

    #[error("Future already completed: {0}")]
    AlreadyCompleted(FutureId),

    #[error("Future still pending: {0}")]
    StillPending(FutureId),

    #[error("Future identifiers exhausted")]
    ExhaustedIdentifiers,

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the accessor asked for
        expected: PayloadKind,
        /// The type actually stored
        found: PayloadKind,
    },

    /// The future was destroyed while this frame was waiting on it.
    #[error("Future abandoned before completion: {0}")]
    Abandoned(FutureId),

    #[error("Scheduler disconnected")]
    Disconnected,
}
