//! Identifiers for futures and frames
//!
//! Futures and frames are addressed by plain `u64` values wrapped in
//! distinct newtypes. Future identifiers are recycled once the future they
//! named has been destroyed; frame identifiers are never reused.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::Serialize;

use super::error::{RuntimeError, RuntimeResult};

/// Identifier of a data future.
///
/// Unique among the futures that are live at any instant. The ordering is
/// only there for hashing and indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FutureId(pub u64);

impl FutureId {
    /// Create a future ID from a raw value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the inner value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for FutureId {
    fn from(val: u64) -> Self {
        Self(val)
    }
}

impl fmt::Display for FutureId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Future({})", self.0)
    }
}

/// Identifier of a continuation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl FrameId {
    /// Returns the inner value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Sequential generator for frame IDs.
#[derive(Debug, Default)]
pub struct FrameIdGenerator {
    next_id: u64,
}

impl FrameIdGenerator {
    /// Create a new frame ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the next frame ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> FrameId {
        let id = self.next_id;
        self.next_id += 1;
        FrameId(id)
    }

    /// Whether `id` has been handed out by this generator.
    #[inline]
    pub fn has_issued(
        &self,
        id: FrameId,
    ) -> bool {
        id.0 < self.next_id
    }
}

/// Allocator for future identifiers.
///
/// Fresh identifiers are taken from a counter bounded by `limit`. Released
/// identifiers go to a FIFO free list and are handed out again before the
/// counter advances. Identifiers above the counter may be claimed directly,
/// which is how a `request` on a never-issued identifier creates its future.
#[derive(Debug)]
pub struct IdAllocator {
    /// Next never-issued identifier.
    next: u64,
    /// Exclusive upper bound of the identifier space.
    limit: u64,
    /// Released identifiers awaiting reuse.
    free: VecDeque<u64>,
    /// Identifiers at or above `next` that were claimed out of order.
    claimed: BTreeSet<u64>,
}

impl IdAllocator {
    /// Create an allocator over the full `u64` space.
    pub fn new() -> Self {
        Self::with_limit(u64::MAX)
    }

    /// Create an allocator handing out identifiers in `0..limit`.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            next: 0,
            limit,
            free: VecDeque::new(),
            claimed: BTreeSet::new(),
        }
    }

    /// Allocate an identifier that is not live.
    pub fn allocate(&mut self) -> RuntimeResult<FutureId> {
        if let Some(id) = self.free.pop_front() {
            return Ok(FutureId(id));
        }

        while self.claimed.remove(&self.next) {
            self.next += 1;
        }

        if self.next >= self.limit {
            return Err(RuntimeError::ExhaustedIdentifiers);
        }

        let id = self.next;
        self.next += 1;
        Ok(FutureId(id))
    }

    /// Mark a specific identifier as live.
    ///
    /// The caller guarantees `id` is not currently live.
    pub fn claim(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<()> {
        if id.0 >= self.limit {
            return Err(RuntimeError::ExhaustedIdentifiers);
        }

        if id.0 < self.next {
            self.free.retain(|&free| free != id.0);
        } else {
            self.claimed.insert(id.0);
        }

        Ok(())
    }

    /// Return a destroyed future's identifier for reuse.
    pub fn release(
        &mut self,
        id: FutureId,
    ) {
        if id.0 >= self.next {
            // Claimed out of order; forgetting the claim makes it fresh again.
            self.claimed.remove(&id.0);
        } else {
            self.free.push_back(id.0);
        }
    }

    /// Number of released identifiers waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
