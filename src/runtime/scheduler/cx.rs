//! The handle a frame body uses to reach the runtime.

use smallvec::SmallVec;
use tracing::debug;

use super::frame::{take_note, BlockResult, Frame, Wake};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::future::{FutureStore, Payload};
use crate::runtime::id::{FrameId, FrameIdGenerator, FutureId};

/// Runtime access for the frame currently running.
///
/// Effects on other frames (wakes, spawns) are collected here and applied
/// by the scheduler once the body returns, so the running frame never
/// observes a half-updated run queue.
pub struct FrameCx<'a> {
    frame: FrameId,
    store: &'a mut FutureStore,
    frame_ids: &'a mut FrameIdGenerator,
    spawned: &'a mut Vec<Frame>,
    wakes: &'a mut Vec<Wake>,
    registered: &'a mut SmallVec<[FutureId; 2]>,
    abandoned: &'a mut SmallVec<[FutureId; 1]>,
}

impl<'a> FrameCx<'a> {
    pub(crate) fn new(
        frame: FrameId,
        store: &'a mut FutureStore,
        frame_ids: &'a mut FrameIdGenerator,
        spawned: &'a mut Vec<Frame>,
        wakes: &'a mut Vec<Wake>,
        registered: &'a mut SmallVec<[FutureId; 2]>,
        abandoned: &'a mut SmallVec<[FutureId; 1]>,
    ) -> Self {
        Self {
            frame,
            store,
            frame_ids,
            spawned,
            wakes,
            registered,
            abandoned,
        }
    }

    /// The running frame's identifier.
    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Read a future, registering this frame as a waiter if it is not ready.
    ///
    /// On `Ok(None)` the body should return `Signal::Wait(id)`; the
    /// [`request!`](crate::request) macro does both.
    pub fn request(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<Option<Payload>> {
        // A live future under a noted id is a newer one reusing the identifier.
        if take_note(self.abandoned, id) && !self.store.contains(id) {
            return Err(RuntimeError::Abandoned(id));
        }

        let value = self.store.request(id, self.frame)?;
        if value.is_none() && !self.registered.contains(&id) {
            self.registered.push(id);
        }
        Ok(value)
    }

    /// Read a future without waiting on it.
    pub fn read(
        &self,
        id: FutureId,
    ) -> RuntimeResult<Option<Payload>> {
        self.store.read(id)
    }

    /// Publish the value of a future and wake the frames waiting on it.
    pub fn submit(
        &mut self,
        id: FutureId,
        payload: impl Into<Payload>,
    ) -> RuntimeResult<()> {
        let waiters = self.store.submit(id, payload.into())?;
        self.wakes
            .extend(waiters.into_iter().map(|frame| Wake::ready(id, frame)));
        Ok(())
    }

    /// Allocate a fresh pending future.
    pub fn create(&mut self) -> RuntimeResult<FutureId> {
        self.store.create()
    }

    /// Release a future's storage.
    pub fn destroy(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<()> {
        let waiters = self.store.destroy(id)?;
        debug!("{} destroyed {}", self.frame, id);
        self.wakes
            .extend(waiters.into_iter().map(|frame| Wake::abandoned(id, frame)));
        Ok(())
    }

    /// Create a new frame; it is queued after the current step.
    pub fn spawn<C, F>(
        &mut self,
        block: F,
        context: C,
    ) -> FrameId
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        self.spawn_frame(None, block, context)
    }

    /// Like [`spawn`](Self::spawn), with a name for diagnostics.
    pub fn spawn_named<C, F>(
        &mut self,
        name: impl Into<String>,
        block: F,
        context: C,
    ) -> FrameId
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        self.spawn_frame(Some(name.into()), block, context)
    }

    fn spawn_frame<C, F>(
        &mut self,
        name: Option<String>,
        block: F,
        context: C,
    ) -> FrameId
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        let id = self.frame_ids.next();
        self.spawned.push(Frame::new(id, name, block, context));
        id
    }
}
