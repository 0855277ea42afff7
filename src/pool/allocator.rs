//! The allocator contract between a pool and the objects it manages.

use crate::common::Result;
use crate::pool::Slot;

/// Creates and destroys the objects held by a [`Pool`](super::Pool).
///
/// `allocate` runs on the pool's background allocator thread, never on a
/// claiming thread, so a slow or blocking allocator delays claims only up to
/// their timeout.
pub trait Allocator<T>: Send + Sync {
    /// Create a new object bound to `slot`.
    ///
    /// # Errors
    /// Any error is kept by the pool and reported to the next claimer as
    /// [`PoolError::Allocation`](crate::PoolError::Allocation).
    fn allocate(&self, slot: Slot<T>) -> Result<T>;

    /// Destroy an object the pool no longer needs.
    ///
    /// # Errors
    /// Errors are logged by the pool; the object is considered gone either way.
    fn deallocate(&self, obj: T) -> Result<()>;
}
