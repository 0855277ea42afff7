//! Slot identifier type.

use std::fmt;

/// Identifies one allocated object in a pool.
///
/// Ids are handed out from a counter and never reused, so a stale id can
/// never be confused with the object that replaced it.
///
/// # Example
/// ```
/// use interchangedb_pool::SlotId;
///
/// let slot_id = SlotId::new(5);
/// assert_eq!(slot_id.0, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl SlotId {
    /// Create a new SlotId.
    #[inline]
    pub fn new(id: u64) -> Self {
        SlotId(id)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}
