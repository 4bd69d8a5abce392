//! Remote submission
//!
//! The scheduler runs on one thread. Host threads that produce values
//! asynchronously complete futures through a [`RemoteHandle`]: submissions
//! travel over a channel and the scheduler applies them between steps, so
//! submit-then-wake stays a single serialized operation.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::future::Payload;
use crate::runtime::id::FutureId;

/// A value to store into a future, sent from another thread.
#[derive(Debug)]
pub(crate) struct Submission {
    pub(crate) id: FutureId,
    pub(crate) payload: Payload,
}

/// `Send` handle for completing futures from outside the scheduler thread.
///
/// While any handle is alive, a scheduler with only suspended frames waits
/// for submissions instead of reporting a stall.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    tx: Sender<Submission>,
    _token: Arc<()>,
}

impl RemoteHandle {
    /// Queue a value for future `id`.
    ///
    /// Fails with `Disconnected` once the scheduler has been dropped.
    /// Rejections by the store (`AlreadyCompleted`, `UnknownFuture`) happen
    /// later, on the scheduler thread, and show up in its statistics.
    pub fn submit(
        &self,
        id: FutureId,
        payload: impl Into<Payload>,
    ) -> RuntimeResult<()> {
        self.tx
            .send(Submission {
                id,
                payload: payload.into(),
            })
            .map_err(|_| RuntimeError::Disconnected)
    }
}

/// Receiving side, owned by the scheduler.
#[derive(Debug)]
pub(crate) struct RemoteInbox {
    tx: Sender<Submission>,
    rx: Receiver<Submission>,
    token: Arc<()>,
}

impl RemoteInbox {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            tx,
            rx,
            token: Arc::new(()),
        }
    }

    pub(crate) fn handle(&self) -> RemoteHandle {
        RemoteHandle {
            tx: self.tx.clone(),
            _token: self.token.clone(),
        }
    }

    /// Whether any handle is still alive.
    #[inline]
    pub(crate) fn has_handles(&self) -> bool {
        Arc::strong_count(&self.token) > 1
    }

    #[inline]
    pub(crate) fn try_recv(&self) -> Option<Submission> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Option<Submission> {
        match self.rx.recv_timeout(timeout) {
            Ok(submission) => Some(submission),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
