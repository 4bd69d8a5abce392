//! Data futures and the future store
//!
//! The [`FutureStore`] is the single source of truth for which futures exist
//! and what they hold. A future is written exactly once and may be read any
//! number of times until it is destroyed.
//!
//! - [`DataFuture`] - one write-once slot plus the frames waiting on it
//! - [`Payload`] - the tagged value a ready future carries
//! - [`DestroyPolicy`] - what destroying a still-pending future does

pub mod payload;

pub use payload::{OpaqueValue, Payload, PayloadKind};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::error::{RuntimeError, RuntimeResult};
use super::id::{FrameId, FutureId, IdAllocator};

/// Frames released by a single store operation, in registration order.
pub type Waiters = SmallVec<[FrameId; 2]>;

/// What `destroy` does with a future that has no value yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestroyPolicy {
    /// Refuse with `StillPending`.
    #[default]
    Reject,
    /// Remove the future and wake its waiters; their next request of it
    /// fails with `Abandoned`.
    ///
    /// If the identifier has been handed to a new future by then, the
    /// waiter sees that future instead of the error.
    Abandon,
}

/// State of a data future.
#[derive(Debug, Clone, PartialEq)]
pub enum FutureState {
    /// No value yet.
    Pending,
    /// Value set exactly once.
    Ready(Payload),
}

/// A single write-once value container.
#[derive(Debug)]
pub struct DataFuture {
    id: FutureId,
    state: FutureState,
    waiters: Waiters,
}

impl DataFuture {
    fn new(id: FutureId) -> Self {
        Self {
            id,
            state: FutureState::Pending,
            waiters: SmallVec::new(),
        }
    }

    /// The future's identifier.
    #[inline]
    pub fn id(&self) -> FutureId {
        self.id
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> &FutureState {
        &self.state
    }

    /// Whether a value has been submitted.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, FutureState::Ready(_))
    }

    /// The value, if ready.
    #[inline]
    pub fn value(&self) -> Option<&Payload> {
        match &self.state {
            FutureState::Ready(value) => Some(value),
            FutureState::Pending => None,
        }
    }

    /// Frames currently registered as waiting on this future.
    #[inline]
    pub fn waiters(&self) -> &[FrameId] {
        &self.waiters
    }

    fn add_waiter(
        &mut self,
        frame: FrameId,
    ) {
        if !self.waiters.contains(&frame) {
            self.waiters.push(frame);
        }
    }
}

/// Owner of every live data future.
#[derive(Debug, Default)]
pub struct FutureStore {
    futures: HashMap<FutureId, DataFuture>,
    ids: IdAllocator,
    policy: DestroyPolicy,
}

impl FutureStore {
    /// Create an empty store over the full identifier space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a capped identifier space and destroy policy.
    pub fn with_config(
        id_limit: Option<u64>,
        policy: DestroyPolicy,
    ) -> Self {
        let ids = match id_limit {
            Some(limit) => IdAllocator::with_limit(limit),
            None => IdAllocator::new(),
        };

        Self {
            futures: HashMap::new(),
            ids,
            policy,
        }
    }

    /// Allocate a fresh pending future.
    pub fn create(&mut self) -> RuntimeResult<FutureId> {
        let id = self.ids.allocate()?;
        self.futures.insert(id, DataFuture::new(id));
        debug!("created {}", id);
        Ok(id)
    }

    /// Complete a future and release its waiters.
    ///
    /// The returned frames were suspended on `id`, in the order they asked.
    pub fn submit(
        &mut self,
        id: FutureId,
        payload: Payload,
    ) -> RuntimeResult<Waiters> {
        let future = self
            .futures
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownFuture(id))?;

        if future.is_ready() {
            return Err(RuntimeError::AlreadyCompleted(id));
        }

        future.state = FutureState::Ready(payload);
        let waiters = std::mem::take(&mut future.waiters);
        debug!("submitted {} ({} waiting)", id, waiters.len());
        Ok(waiters)
    }

    /// Read a future without registering interest.
    ///
    /// `Ok(None)` means pending, which is not an error.
    pub fn read(
        &self,
        id: FutureId,
    ) -> RuntimeResult<Option<Payload>> {
        self.futures
            .get(&id)
            .map(|future| future.value().cloned())
            .ok_or(RuntimeError::UnknownFuture(id))
    }

    /// Read a future on behalf of `frame`, registering it as a waiter when
    /// the value is not there yet.
    ///
    /// An identifier that is not live gets a fresh pending future.
    pub fn request(
        &mut self,
        id: FutureId,
        frame: FrameId,
    ) -> RuntimeResult<Option<Payload>> {
        let future = self.live_or_claim(id)?;

        if let Some(value) = future.value() {
            return Ok(Some(value.clone()));
        }

        future.add_waiter(frame);
        trace!("{} waits on {}", frame, id);
        Ok(None)
    }

    /// Register `frame` as a waiter of `id`.
    ///
    /// Returns `false` without registering when the future is already ready.
    pub fn add_waiter(
        &mut self,
        id: FutureId,
        frame: FrameId,
    ) -> RuntimeResult<bool> {
        let future = self.live_or_claim(id)?;

        if future.is_ready() {
            return Ok(false);
        }

        future.add_waiter(frame);
        Ok(true)
    }

    /// Drop `frame` from the waiters of `id`. Unknown futures are ignored.
    pub fn remove_waiter(
        &mut self,
        id: FutureId,
        frame: FrameId,
    ) {
        if let Some(future) = self.futures.get_mut(&id) {
            future.waiters.retain(|waiter| *waiter != frame);
        }
    }

    /// Release the storage of a future.
    ///
    /// For a pending future this depends on the [`DestroyPolicy`]: `Reject`
    /// fails with `StillPending`, `Abandon` removes it and returns the
    /// waiters it had.
    pub fn destroy(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<Waiters> {
        let future = self
            .futures
            .get(&id)
            .ok_or(RuntimeError::UnknownFuture(id))?;

        if !future.is_ready() && self.policy == DestroyPolicy::Reject {
            return Err(RuntimeError::StillPending(id));
        }

        let waiters = match self.futures.remove(&id) {
            Some(future) => future.waiters,
            None => SmallVec::new(),
        };
        self.ids.release(id);
        debug!("destroyed {}", id);
        Ok(waiters)
    }

    /// Whether `id` names a live future.
    #[inline]
    pub fn contains(
        &self,
        id: FutureId,
    ) -> bool {
        self.futures.contains_key(&id)
    }

    /// Whether the future has a value.
    pub fn is_ready(
        &self,
        id: FutureId,
    ) -> RuntimeResult<bool> {
        self.get(id).map(DataFuture::is_ready)
    }

    /// Look up a live future.
    pub fn get(
        &self,
        id: FutureId,
    ) -> RuntimeResult<&DataFuture> {
        self.futures.get(&id).ok_or(RuntimeError::UnknownFuture(id))
    }

    /// Frames waiting on `id`.
    pub fn waiters(
        &self,
        id: FutureId,
    ) -> RuntimeResult<&[FrameId]> {
        self.get(id).map(DataFuture::waiters)
    }

    /// Number of live futures.
    #[inline]
    pub fn len(&self) -> usize {
        self.futures.len()
    }

    /// Whether no futures are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// Number of live futures without a value.
    pub fn pending_count(&self) -> usize {
        self.futures.values().filter(|f| !f.is_ready()).count()
    }

    /// The destroy policy in force.
    #[inline]
    pub fn policy(&self) -> DestroyPolicy {
        self.policy
    }

    fn live_or_claim(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<&mut DataFuture> {
        if !self.futures.contains_key(&id) {
            self.ids.claim(id)?;
            debug!("implicitly created {}", id);
        }

        Ok(self
            .futures
            .entry(id)
            .or_insert_with(|| DataFuture::new(id)))
    }
}

#[cfg(test)]
mod tests;
