//! Common types and utilities shared across the crate.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration defaults
//! - Error types
//! - Identifiers (SlotId)

pub mod config;
pub mod error;
mod slot_id;

pub use error::{ClientInfoStatus, Error, PoolError, Result};
pub use slot_id::SlotId;
