//! Expiration policies.
//!
//! An [`Expiration`] is consulted every time an idle object is about to be
//! claimed. Expired objects are deallocated and replaced instead of being
//! handed out.

use std::time::Duration;

use crate::pool::SlotInfo;

/// Decides whether an idle object is too stale to be claimed.
pub trait Expiration<T>: Send + Sync {
    /// Return `true` to have `obj` deallocated instead of claimed.
    ///
    /// Called with the pool lock held; must not call back into the pool.
    fn has_expired(&self, info: &SlotInfo, obj: &T) -> bool;
}

/// Expires objects once they reach a maximum age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeExpiration {
    max_age: Duration,
}

impl TimeExpiration {
    /// Expire objects older than `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// The configured maximum age.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl<T> Expiration<T> for TimeExpiration {
    fn has_expired(&self, info: &SlotInfo, _obj: &T) -> bool {
        info.age() >= self.max_age
    }
}

/// Never expires anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverExpire;

impl<T> Expiration<T> for NeverExpire {
    fn has_expired(&self, _info: &SlotInfo, _obj: &T) -> bool {
        false
    }
}
