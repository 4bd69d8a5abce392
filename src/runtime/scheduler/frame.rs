//! Continuation frames and scheduling signals.

use std::fmt;

use smallvec::SmallVec;

use super::cx::FrameCx;
use crate::runtime::error::RuntimeResult;
use crate::runtime::id::{FrameId, FutureId};

/// What a frame body returns from one step.
pub type BlockResult = RuntimeResult<Signal>;

/// A frame body with its context already bound in.
pub(crate) type Block = Box<dyn FnMut(&mut FrameCx<'_>) -> BlockResult>;

/// Outcome of running a frame body once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Progress was made; run again later.
    Continue,
    /// Blocked until the given future is ready.
    Wait(FutureId),
    /// The frame is finished and can be dropped.
    Done,
    /// Shut the whole runtime down.
    Exit,
    /// The frame failed; other frames keep running.
    Fail(String),
}

impl Signal {
    /// Build a failure signal.
    pub fn fail(reason: impl Into<String>) -> Self {
        Signal::Fail(reason.into())
    }

    /// Whether this signal removes the frame from the scheduler.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Signal::Done | Signal::Exit | Signal::Fail(_))
    }
}

/// Frame state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Queued and eligible to run.
    Runnable,
    /// Its body is executing right now.
    Running,
    /// Waiting for the given future.
    Suspended(FutureId),
    /// Finished, failed or abandoned; no longer held by the scheduler.
    Terminated,
}

/// A schedulable unit of work.
pub(crate) struct Frame {
    pub(crate) id: FrameId,
    pub(crate) name: String,
    pub(crate) block: Block,
    pub(crate) state: FrameState,
    /// Number of times the body has run.
    pub(crate) steps: u64,
    /// Futures destroyed under this frame while it waited on them.
    pub(crate) abandoned: SmallVec<[FutureId; 1]>,
}

impl fmt::Debug for Frame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Frame {
    /// Bind `context` into `block`; the frame owns both from here on.
    pub(crate) fn new<C, F>(
        id: FrameId,
        name: Option<String>,
        mut block: F,
        mut context: C,
    ) -> Self
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        let block: Block = Box::new(move |cx: &mut FrameCx<'_>| block(cx, &mut context));

        Self {
            id,
            name: name.unwrap_or_else(|| id.to_string()),
            block,
            state: FrameState::Runnable,
            steps: 0,
            abandoned: SmallVec::new(),
        }
    }

    /// Remove the destroyed-while-waiting note for `future`, if any.
    pub(crate) fn take_abandoned(
        &mut self,
        future: FutureId,
    ) -> bool {
        take_note(&mut self.abandoned, future)
    }
}

/// Remove `future` from a list of abandoned notes.
pub(crate) fn take_note(
    notes: &mut SmallVec<[FutureId; 1]>,
    future: FutureId,
) -> bool {
    match notes.iter().position(|note| *note == future) {
        Some(pos) => {
            notes.remove(pos);
            true
        }
        None => false,
    }
}

/// A frame released from a future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Wake {
    pub(crate) frame: FrameId,
    pub(crate) future: FutureId,
    /// The future was destroyed rather than completed.
    pub(crate) abandoned: bool,
}

impl Wake {
    #[inline]
    pub(crate) fn ready(
        future: FutureId,
        frame: FrameId,
    ) -> Self {
        Self {
            frame,
            future,
            abandoned: false,
        }
    }

    #[inline]
    pub(crate) fn abandoned(
        future: FutureId,
        frame: FrameId,
    ) -> Self {
        Self {
            frame,
            future,
            abandoned: true,
        }
    }
}
