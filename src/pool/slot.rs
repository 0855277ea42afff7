//! Slot - the pool's bookkeeping handle for one allocated object.
//!
//! A [`Slot`] is handed to the [`Allocator`](super::Allocator) together with
//! each allocation. The object keeps it and uses it to hand itself back:
//! - [`Slot::release`] - return the object to the idle stack for re-claim
//! - [`Slot::discard`] - retire the object so it is deallocated and replaced

use std::fmt;
use std::sync::Weak;
use std::time::{Duration, Instant};

use crate::common::SlotId;

/// Receiving end of a slot: where released and discarded objects go.
///
/// Implemented by the pool's shared state. Kept crate-private so tests can
/// substitute a capturing sink.
pub(crate) trait Reclaim<T>: Send + Sync {
    fn release(&self, id: SlotId, obj: T);
    fn discard(&self, id: SlotId, obj: T);
}

/// Handle used by a pooled object to return itself to its pool.
///
/// Holds only a weak reference. A shut-down pool stays alive until every
/// claimed object has come back through its slot; if the pool is gone
/// anyway, the object is dropped.
pub struct Slot<T> {
    id: SlotId,
    sink: Weak<dyn Reclaim<T>>,
}

impl<T: 'static> Slot<T> {
    pub(crate) fn new(id: SlotId, sink: Weak<dyn Reclaim<T>>) -> Self {
        Self { id, sink }
    }

    /// The id of the slot this object occupies.
    #[inline]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Whether the pool behind this slot is still alive.
    pub fn is_attached(&self) -> bool {
        self.sink.strong_count() > 0
    }

    /// Make `obj` available for claiming again.
    pub fn release(&self, obj: T) {
        match self.sink.upgrade() {
            Some(sink) => sink.release(self.id, obj),
            None => tracing::debug!(slot = %self.id, "pool is gone; dropping released object"),
        }
    }

    /// Retire `obj`: the pool deallocates it and allocates a replacement.
    pub fn discard(&self, obj: T) {
        match self.sink.upgrade() {
            Some(sink) => sink.discard(self.id, obj),
            None => tracing::debug!(slot = %self.id, "pool is gone; dropping discarded object"),
        }
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sink: self.sink.clone(),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("id", &self.id)
            .field("pool_alive", &(self.sink.strong_count() > 0))
            .finish()
    }
}

/// Metadata the pool keeps for each live object.
///
/// Passed to [`Expiration`](super::Expiration) policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    id: SlotId,
    created_at: Instant,
    claim_count: u64,
}

impl SlotInfo {
    pub(crate) fn new(id: SlotId) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            claim_count: 0,
        }
    }

    /// Id of the slot.
    #[inline]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// When the object in this slot was allocated.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the object was allocated.
    #[inline]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// How many times the object has been claimed, including the current claim.
    #[inline]
    pub fn claim_count(&self) -> u64 {
        self.claim_count
    }

    pub(crate) fn record_claim(&mut self) {
        self.claim_count += 1;
    }
}
