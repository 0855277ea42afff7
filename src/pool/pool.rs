//! Pool - a bounded set of reusable objects kept filled by a background
//! allocator thread.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::common::{Error, PoolError, Result, SlotId};
use crate::pool::interrupt::{self, WaitRegistration};
use crate::pool::slot::Reclaim;
use crate::pool::{Allocator, Config, Expiration, PoolStats, Slot, SlotInfo};

/// A bounded pool of objects created by an [`Allocator`].
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                          Pool<T>                            │
/// │  ┌─────────────────────────────────────────────────────┐    │
/// │  │ state: Mutex<State>                                 │    │
/// │  │   idle: Vec<(SlotId, T)>   LIFO stack of free objs  │    │
/// │  │   slots: SlotId → SlotInfo live objects (any state) │    │
/// │  │   poisoned: VecDeque<Error> failed allocations      │    │
/// │  │   dead: Vec<T>             waiting for deallocation │    │
/// │  └─────────────────────────────────────────────────────┘    │
/// │  available: Condvar ──▶ claimers      work: Condvar ──┐     │
/// │                                                       ▼     │
/// │                                   ┌──────────────────────┐  │
/// │                                   │ allocator thread     │  │
/// │                                   │ fill / shrink / free │  │
/// │                                   └──────────────────────┘  │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Allocation and deallocation always run with the lock released, so a
/// slow allocator never blocks a claim for longer than its timeout.
///
/// # Usage
/// ```ignore
/// let pool = Pool::new(Config::new().with_size(4).with_allocator(alloc))?;
///
/// if let Some(obj) = pool.claim(Duration::from_secs(1))? {
///     // use obj, then hand it back through the slot it was allocated with
/// }
/// ```
pub struct Pool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,

    /// Signalled when an object or an allocation failure becomes claimable,
    /// and when the pool drains after shutdown.
    available: Condvar,

    /// Signalled when the allocator thread has something to do.
    work: Condvar,

    allocator: Arc<dyn Allocator<T>>,
    expiration: Arc<dyn Expiration<T>>,
    stats: PoolStats,
}

struct Idle<T> {
    id: SlotId,
    obj: T,
}

struct State<T> {
    idle: Vec<Idle<T>>,
    slots: HashMap<SlotId, SlotInfo>,
    poisoned: VecDeque<Error>,
    dead: Vec<T>,
    allocating: usize,
    deallocating: usize,
    target_size: usize,
    next_id: u64,
    shut_down: bool,
    worker_running: bool,
}

impl<T> State<T> {
    /// Slots counted against the target size. A failed allocation keeps its
    /// slot occupied until a claimer has seen the error.
    fn population(&self) -> usize {
        self.slots.len() + self.poisoned.len() + self.allocating
    }

    fn next_slot_id(&mut self) -> SlotId {
        let id = SlotId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn is_drained(&self) -> bool {
        !self.worker_running && self.slots.is_empty() && self.dead.is_empty() && self.deallocating == 0
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Create a pool and start its allocator thread.
    ///
    /// The pool starts empty and fills up in the background.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the config does not validate
    /// - `Error::Io` if the allocator thread cannot be spawned
    pub fn new(config: Config<T>) -> Result<Self> {
        config.validate()?;
        let allocator = config
            .allocator()
            .cloned()
            .ok_or_else(|| Error::invalid_argument("an allocator is required"))?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                idle: Vec::with_capacity(config.size()),
                slots: HashMap::with_capacity(config.size()),
                poisoned: VecDeque::new(),
                dead: Vec::new(),
                allocating: 0,
                deallocating: 0,
                target_size: config.size(),
                next_id: 0,
                shut_down: false,
                worker_running: true,
            }),
            available: Condvar::new(),
            work: Condvar::new(),
            allocator,
            expiration: Arc::clone(config.expiration()),
            stats: PoolStats::new(),
        });

        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name("pool-allocator".into())
            .spawn(move || run_allocator(worker))?;

        tracing::info!(size = config.size(), "pool started");
        Ok(Self { shared })
    }

    // ========================================================================
    // Public API: Claim
    // ========================================================================

    /// Claim an object, waiting up to `timeout` for one to become available.
    ///
    /// Returns `Ok(None)` if the timeout elapses first. A zero timeout only
    /// takes an object that is already idle.
    ///
    /// # Errors
    /// - `PoolError::Allocation` if the allocator failed for the slot this
    ///   claim would have received
    /// - `PoolError::Interrupted` if the calling thread is interrupted, see
    ///   [`Interrupter`](super::Interrupter)
    /// - `PoolError::ShutDown` if the pool has been shut down
    pub fn claim(&self, timeout: Duration) -> std::result::Result<Option<T>, PoolError> {
        if interrupt::interrupted() {
            return Err(PoolError::Interrupted);
        }
        let deadline = Instant::now().checked_add(timeout);
        let registration = WaitRegistration::register(self.waker());
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        loop {
            if state.shut_down {
                return Err(PoolError::ShutDown);
            }

            if let Some(cause) = state.poisoned.pop_front() {
                // The slot is free again; let the allocator retry it.
                shared.work.notify_one();
                return Err(PoolError::Allocation(Box::new(cause)));
            }

            if let Some(Idle { id, obj }) = state.idle.pop() {
                let expired = match state.slots.get_mut(&id) {
                    Some(info) => {
                        let expired = shared.expiration.has_expired(info, &obj);
                        if !expired {
                            info.record_claim();
                        }
                        expired
                    }
                    None => true,
                };
                if expired {
                    PoolStats::bump(&shared.stats.expirations);
                    tracing::debug!(slot = %id, "idle object expired");
                    if let Some(obj) = shared.retire(&mut state, id, obj) {
                        shared.deallocate_unlocked(&mut state, obj);
                    }
                    continue;
                }
                PoolStats::bump(&shared.stats.claims);
                return Ok(Some(obj));
            }

            if registration.take_interrupt() {
                return Err(PoolError::Interrupted);
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        PoolStats::bump(&shared.stats.timeouts);
                        return Ok(None);
                    }
                    shared.available.wait_until(&mut state, deadline);
                }
                None => shared.available.wait(&mut state),
            }
        }
    }

    /// Waker run by an [`Interrupter`](super::Interrupter) to get a blocked
    /// claim to re-check its flag.
    fn waker(&self) -> Arc<dyn Fn() + Send + Sync> {
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Arc::new(move || {
            if let Some(shared) = shared.upgrade() {
                let _state = shared.state.lock();
                shared.available.notify_all();
            }
        })
    }

    // ========================================================================
    // Public API: Sizing
    // ========================================================================

    /// Number of objects the pool tries to keep.
    pub fn target_size(&self) -> usize {
        self.shared.state.lock().target_size
    }

    /// Change the number of objects the pool keeps.
    ///
    /// Growing allocates in the background. Shrinking deallocates idle
    /// objects first and claimed objects as they are released.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if `size` is zero.
    pub fn set_target_size(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::invalid_argument("pool size must be greater than zero"));
        }
        let mut state = self.shared.state.lock();
        state.target_size = size;
        self.shared.work.notify_one();
        Ok(())
    }

    /// Number of live objects, claimed or idle.
    pub fn allocated_count(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Number of objects ready to be claimed.
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.shared.stats
    }

    // ========================================================================
    // Public API: Shutdown
    // ========================================================================

    /// Stop the pool.
    ///
    /// Pending and future claims fail with `PoolError::ShutDown`. Idle
    /// objects are deallocated now; claimed objects when they are released.
    /// Idempotent.
    pub fn shutdown(&self) -> Completion<T> {
        let mut state = self.shared.state.lock();
        if !state.shut_down {
            state.shut_down = true;
            for Idle { id, obj } in std::mem::take(&mut state.idle) {
                state.slots.remove(&id);
                state.dead.push(obj);
            }
            state.poisoned.clear();
            tracing::info!(claimed = state.slots.len(), "pool shutting down");
            self.shared.work.notify_all();
            self.shared.available.notify_all();
        }
        drop(state);
        Completion {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }
}

impl<T: Send + 'static> Drop for Pool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Send + 'static> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Pool")
            .field("target_size", &state.target_size)
            .field("allocated", &state.slots.len())
            .field("idle", &state.idle.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}

/// Tracks a shutdown until every object has been deallocated.
pub struct Completion<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Completion<T> {
    /// Wait up to `timeout` for the pool to drain.
    ///
    /// Returns `true` once every object has been deallocated and the
    /// allocator thread has stopped.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        while !state.is_drained() {
            match deadline {
                Some(deadline) => {
                    if self.shared.available.wait_until(&mut state, deadline).timed_out() {
                        return state.is_drained();
                    }
                }
                None => self.shared.available.wait(&mut state),
            }
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.shared.state.lock().is_drained()
    }
}

// ============================================================================
// Shared state
// ============================================================================

impl<T: Send + 'static> Shared<T> {
    /// Drop `id` from the live set and queue `obj` for the allocator thread.
    ///
    /// Hands the object back when that thread has already stopped; the
    /// caller must then pass it to [`deallocate_unlocked`](Self::deallocate_unlocked).
    fn retire(&self, state: &mut State<T>, id: SlotId, obj: T) -> Option<T> {
        state.slots.remove(&id);
        if state.worker_running {
            state.dead.push(obj);
            self.work.notify_one();
            None
        } else {
            Some(obj)
        }
    }

    fn deallocate_unlocked(&self, state: &mut MutexGuard<'_, State<T>>, obj: T) {
        state.deallocating += 1;
        MutexGuard::unlocked(state, || self.deallocate(obj));
        state.deallocating -= 1;
        self.available.notify_all();
    }

    fn deallocate(&self, obj: T) {
        PoolStats::bump(&self.stats.deallocations);
        if let Err(err) = self.allocator.deallocate(obj) {
            tracing::warn!(error = %err, "failed to deallocate pooled object");
        }
    }

    /// Record the outcome of one allocation.
    fn accept(&self, state: &mut State<T>, id: SlotId, result: Result<T>) {
        match result {
            Ok(obj) => {
                PoolStats::bump(&self.stats.allocations);
                if state.shut_down {
                    state.dead.push(obj);
                } else {
                    tracing::trace!(slot = %id, "allocated");
                    state.slots.insert(id, SlotInfo::new(id));
                    state.idle.push(Idle { id, obj });
                }
            }
            Err(err) => {
                PoolStats::bump(&self.stats.allocation_failures);
                tracing::warn!(slot = %id, error = %err, "allocation failed");
                if !state.shut_down {
                    state.poisoned.push_back(err);
                }
            }
        }
        self.available.notify_one();
    }
}

impl<T: Send + 'static> Reclaim<T> for Shared<T> {
    fn release(&self, id: SlotId, obj: T) {
        PoolStats::bump(&self.stats.releases);
        let mut state = self.state.lock();
        let keep = !state.shut_down
            && state.slots.contains_key(&id)
            && state.population() <= state.target_size;

        if keep {
            state.idle.push(Idle { id, obj });
            self.available.notify_one();
        } else if let Some(obj) = self.retire(&mut state, id, obj) {
            self.deallocate_unlocked(&mut state, obj);
        }
    }

    fn discard(&self, id: SlotId, obj: T) {
        tracing::debug!(slot = %id, "discarding pooled object");
        let mut state = self.state.lock();
        if let Some(obj) = self.retire(&mut state, id, obj) {
            self.deallocate_unlocked(&mut state, obj);
        }
    }
}

/// Body of the allocator thread.
///
/// Deallocates dead objects first, then fills or shrinks towards the target
/// size, then sleeps until signalled. Exits once shut down and every claimed
/// object has been returned and deallocated.
fn run_allocator<T: Send + 'static>(shared: Arc<Shared<T>>) {
    let weak: Weak<Shared<T>> = Arc::downgrade(&shared);
    let sink: Weak<dyn Reclaim<T>> = weak;
    let mut state = shared.state.lock();

    loop {
        if let Some(obj) = state.dead.pop() {
            shared.deallocate_unlocked(&mut state, obj);
            continue;
        }

        if state.shut_down {
            // Objects still claimed come back through their slots and are
            // deallocated here.
            if state.slots.is_empty() {
                break;
            }
            shared.work.wait(&mut state);
            continue;
        }

        if state.population() < state.target_size {
            let id = state.next_slot_id();
            let slot = Slot::new(id, sink.clone());
            state.allocating += 1;
            let result = MutexGuard::unlocked(&mut state, || shared.allocator.allocate(slot));
            state.allocating -= 1;
            shared.accept(&mut state, id, result);
            continue;
        }

        if state.population() > state.target_size {
            if let Some(Idle { id, obj }) = state.idle.pop() {
                state.slots.remove(&id);
                state.dead.push(obj);
                continue;
            }
            if state.poisoned.pop_front().is_some() {
                continue;
            }
        }

        shared.work.wait(&mut state);
    }

    state.worker_running = false;
    drop(state);
    shared.available.notify_all();
    tracing::debug!("allocator thread stopped");
}
