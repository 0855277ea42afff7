//! Object pool engine.
//!
//! A generic, bounded pool of reusable objects. Objects are created by an
//! [`Allocator`] on a background thread and handed out by [`Pool::claim`].
//! Each object carries the [`Slot`] it was allocated into and uses it to
//! return itself.
//!
//! # Components
//! - [`Pool`] - The pool itself
//! - [`Config`] - Size, allocator and expiration settings
//! - [`Allocator`] - Creates and destroys pooled objects
//! - [`Expiration`] - Decides when an idle object is too old to hand out
//! - [`Slot`] / [`SlotInfo`] - Per-object handle and metadata
//! - [`Interrupter`] - Cancels a blocked claim from another thread
//! - [`PoolStats`] - Counters

mod allocator;
mod config;
mod expiration;
pub mod interrupt;
#[allow(clippy::module_inception)]
mod pool;
pub(crate) mod slot;
mod stats;

pub use allocator::Allocator;
pub use config::Config;
pub use expiration::{Expiration, NeverExpire, TimeExpiration};
pub use interrupt::Interrupter;
pub use pool::{Completion, Pool};
pub use slot::{Slot, SlotInfo};
pub use stats::{PoolStats, StatsSnapshot};
