//! Cooperative interruption of blocked claims.
//!
//! Every thread owns an interrupt flag. Another thread can raise it through
//! an [`Interrupter`] obtained on the target thread. A claim checks the flag
//! on entry and while waiting; a raised flag makes the claim fail with
//! [`PoolError::Interrupted`](crate::PoolError::Interrupted) and clears it.
//!
//! ```text
//!  waiting thread                      other thread
//!  ──────────────                      ────────────
//!  let i = Interrupter::current();
//!  (hand `i` over)  ─────────────────▶ i.interrupt()
//!  pool.claim(..) blocks                 │ sets flag
//!        ▲                               │ runs registered waker
//!        └─────── wakes, sees flag ◀─────┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct InterruptState {
    flag: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState::default());
}

fn current_state() -> Arc<InterruptState> {
    CURRENT.with(Arc::clone)
}

/// Handle that interrupts one particular thread.
#[derive(Clone)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    /// Interrupter for the calling thread.
    pub fn current() -> Self {
        Self {
            state: current_state(),
        }
    }

    /// Raise the target thread's flag and wake it if it is blocked in a claim.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::Release);
        let waker = self.state.waker.lock().clone();
        if let Some(wake) = waker {
            wake();
        }
    }

    /// Whether the flag is raised. Does not clear it.
    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupter")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Check and clear the calling thread's interrupt flag.
pub fn interrupted() -> bool {
    current_state().flag.swap(false, Ordering::AcqRel)
}

/// Registration of a waker for the duration of a blocking wait.
///
/// Dropping it unregisters the waker.
pub(crate) struct WaitRegistration {
    state: Arc<InterruptState>,
}

impl WaitRegistration {
    /// Register `waker` for the calling thread.
    pub(crate) fn register(waker: Waker) -> Self {
        let state = current_state();
        *state.waker.lock() = Some(waker);
        Self { state }
    }

    /// Check and clear the flag of the registered thread.
    pub(crate) fn take_interrupt(&self) -> bool {
        self.state.flag.swap(false, Ordering::AcqRel)
    }
}

impl Drop for WaitRegistration {
    fn drop(&mut self) {
        self.state.waker.lock().take();
    }
}
