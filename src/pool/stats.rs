//! Pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a [`Pool`](super::Pool).
///
/// All fields are atomic and updated with `Ordering::Relaxed`: the counters
/// are independent of each other and of the pool state, so only atomicity
/// is needed.
///
/// # Example
/// ```
/// use interchangedb_pool::PoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = PoolStats::new();
/// stats.claims.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.claims.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug)]
pub struct PoolStats {
    /// Successful claims.
    pub claims: AtomicU64,

    /// Claims that gave up because the timeout elapsed.
    pub timeouts: AtomicU64,

    /// Objects produced by the allocator.
    pub allocations: AtomicU64,

    /// Allocator calls that returned an error.
    pub allocation_failures: AtomicU64,

    /// Objects handed back through their slot.
    pub releases: AtomicU64,

    /// Idle objects rejected by the expiration policy.
    pub expirations: AtomicU64,

    /// Objects passed to the allocator for destruction.
    pub deallocations: AtomicU64,
}

impl PoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            claims: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of claim attempts that timed out (0.0 to 1.0).
    pub fn timeout_rate(&self) -> f64 {
        self.snapshot().timeout_rate()
    }

    /// Get a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            claims: self.claims.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.claims.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.allocations.store(0, Ordering::Relaxed);
        self.allocation_failures.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.deallocations.store(0, Ordering::Relaxed);
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub claims: u64,
    pub timeouts: u64,
    pub allocations: u64,
    pub allocation_failures: u64,
    pub releases: u64,
    pub expirations: u64,
    pub deallocations: u64,
}

impl StatsSnapshot {
    /// Fraction of claim attempts that timed out (0.0 to 1.0).
    pub fn timeout_rate(&self) -> f64 {
        let total = self.claims + self.timeouts;
        if total == 0 {
            0.0
        } else {
            self.timeouts as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ claims: {}, timeouts: {}, allocations: {}, failures: {}, deallocations: {}, timeout_rate: {:.2}% }}",
            self.claims,
            self.timeouts,
            self.allocations,
            self.allocation_failures,
            self.deallocations,
            self.timeout_rate() * 100.0
        )
    }
}
