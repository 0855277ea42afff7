//! Pool configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::common::config::{DEFAULT_MAX_AGE, DEFAULT_POOL_SIZE};
use crate::common::{Error, Result};
use crate::pool::{Allocator, Expiration, TimeExpiration};

/// Settings for a [`Pool`](super::Pool).
///
/// Built with chained `with_*` calls:
/// ```ignore
/// let config = Config::new()
///     .with_size(4)
///     .with_allocator(my_allocator)
///     .with_expiration(NeverExpire);
/// let pool = Pool::new(config)?;
/// ```
pub struct Config<T> {
    size: usize,
    expiration: Arc<dyn Expiration<T>>,
    allocator: Option<Arc<dyn Allocator<T>>>,
}

impl<T: 'static> Config<T> {
    /// Defaults: [`DEFAULT_POOL_SIZE`] objects, expired after
    /// [`DEFAULT_MAX_AGE`], no allocator.
    pub fn new() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            expiration: Arc::new(TimeExpiration::new(DEFAULT_MAX_AGE)),
            allocator: None,
        }
    }

    /// Set the number of objects the pool keeps.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the allocator that creates and destroys pooled objects.
    pub fn with_allocator(mut self, allocator: impl Allocator<T> + 'static) -> Self {
        self.allocator = Some(Arc::new(allocator));
        self
    }

    /// Like [`with_allocator`](Self::with_allocator) for an allocator that
    /// is already shared.
    pub fn with_shared_allocator(mut self, allocator: Arc<dyn Allocator<T>>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Set the expiration policy.
    pub fn with_expiration(mut self, expiration: impl Expiration<T> + 'static) -> Self {
        self.expiration = Arc::new(expiration);
        self
    }

    /// Like [`with_expiration`](Self::with_expiration) for a shared policy.
    pub fn with_shared_expiration(mut self, expiration: Arc<dyn Expiration<T>>) -> Self {
        self.expiration = expiration;
        self
    }

    /// Expire objects after `max_age`.
    pub fn with_max_age(self, max_age: Duration) -> Self {
        self.with_expiration(TimeExpiration::new(max_age))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn expiration(&self) -> &Arc<dyn Expiration<T>> {
        &self.expiration
    }

    pub fn allocator(&self) -> Option<&Arc<dyn Allocator<T>>> {
        self.allocator.as_ref()
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if the size is zero or no allocator is set.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::invalid_argument("pool size must be greater than zero"));
        }
        if self.allocator.is_none() {
            return Err(Error::invalid_argument("an allocator is required"));
        }
        Ok(())
    }
}

impl<T: 'static> Default for Config<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            expiration: Arc::clone(&self.expiration),
            allocator: self.allocator.clone(),
        }
    }
}

impl<T> fmt::Debug for Config<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("size", &self.size)
            .field("has_allocator", &self.allocator.is_some())
            .finish_non_exhaustive()
    }
}
