//! Run queue for the scheduler
//!
//! First-in first-out queue of runnable frames. There are no priorities:
//! every frame is serviced in the order it became runnable.

use std::collections::VecDeque;

use crate::runtime::id::FrameId;

/// FIFO queue of runnable frame IDs.
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    inner: VecDeque<FrameId>,
}

impl RunQueue {
    /// Create a new empty run queue.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    /// Push a frame to the back of the queue.
    #[inline]
    pub fn push(
        &mut self,
        frame: FrameId,
    ) {
        self.inner.push_back(frame);
    }

    /// Pop the frame at the front of the queue.
    #[inline]
    pub fn pop(&mut self) -> Option<FrameId> {
        self.inner.pop_front()
    }

    /// Peek at the front frame without removing it.
    #[inline]
    pub fn peek(&self) -> Option<FrameId> {
        self.inner.front().copied()
    }

    /// Whether the frame is queued.
    #[inline]
    pub fn contains(
        &self,
        frame: FrameId,
    ) -> bool {
        self.inner.contains(&frame)
    }

    /// Get the number of queued frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every queued frame, front first.
    pub fn drain(&mut self) -> impl Iterator<Item = FrameId> + '_ {
        self.inner.drain(..)
    }

    /// Iterate over queued frames, front first.
    pub fn iter(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.inner.iter().copied()
    }
}
