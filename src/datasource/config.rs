//! Configuration for a pooled data source.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::common::config::{DEFAULT_CLAIM_TIMEOUT, DEFAULT_MAX_AGE, DEFAULT_POOL_SIZE};
use crate::common::{Error, Result};
use crate::datasource::wrapper::AsAny;
use crate::datasource::{ConnectionProxy, DataSource, DataSourceAllocator};
use crate::pool::{self, Expiration, TimeExpiration};

/// Settings for a [`PooledDataSource`](super::PooledDataSource).
///
/// # Example
/// ```ignore
/// let config = DataSourceConfig::new()
///     .with_data_source(Arc::new(driver))
///     .with_pool_size(20)
///     .with_max_age(Duration::from_secs(300));
/// let ds = PooledDataSource::from_config(config)?;
/// ```
#[derive(Clone)]
pub struct DataSourceConfig {
    data_source: Option<Arc<dyn DataSource>>,
    pool_size: usize,
    expiration: Arc<dyn Expiration<ConnectionProxy>>,
    claim_timeout: Duration,
}

impl DataSourceConfig {
    /// Defaults: no data source, [`DEFAULT_POOL_SIZE`] connections expiring
    /// after [`DEFAULT_MAX_AGE`], [`DEFAULT_CLAIM_TIMEOUT`].
    pub fn new() -> Self {
        Self {
            data_source: None,
            pool_size: DEFAULT_POOL_SIZE,
            expiration: Arc::new(TimeExpiration::new(DEFAULT_MAX_AGE)),
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
        }
    }

    /// Set the data source to pool connections from.
    pub fn with_data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(data_source);
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_expiration(mut self, expiration: impl Expiration<ConnectionProxy> + 'static) -> Self {
        self.expiration = Arc::new(expiration);
        self
    }

    /// Expire pooled connections after `max_age`.
    pub fn with_max_age(self, max_age: Duration) -> Self {
        self.with_expiration(TimeExpiration::new(max_age))
    }

    /// Claim timeout used until a login timeout is set.
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    pub fn data_source(&self) -> Option<&Arc<dyn DataSource>> {
        self.data_source.as_ref()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn claim_timeout(&self) -> Duration {
        self.claim_timeout
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if no data source is set or the pool size
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.data_source.is_none() {
            return Err(Error::invalid_argument("a data source is required"));
        }
        if self.pool_size == 0 {
            return Err(Error::invalid_argument("pool size must be greater than zero"));
        }
        Ok(())
    }

    /// Validate and derive the pool configuration, with a fresh
    /// [`DataSourceAllocator`] over the configured source.
    ///
    /// # Errors
    /// See [`validate`](Self::validate).
    pub fn build_pool_config(&self) -> Result<pool::Config<ConnectionProxy>> {
        self.validate()?;
        let data_source = self
            .data_source
            .clone()
            .ok_or_else(|| Error::invalid_argument("a data source is required"))?;
        Ok(self.pool_config_for(Arc::new(DataSourceAllocator::new(data_source))))
    }

    pub(crate) fn pool_config_for(&self, allocator: Arc<DataSourceAllocator>) -> pool::Config<ConnectionProxy> {
        pool::Config::new()
            .with_size(self.pool_size)
            .with_shared_expiration(Arc::clone(&self.expiration))
            .with_shared_allocator(allocator)
    }
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("data_source", &self.data_source.as_ref().map(|ds| AsAny::concrete_type_name(&**ds)))
            .field("pool_size", &self.pool_size)
            .field("claim_timeout", &self.claim_timeout)
            .finish_non_exhaustive()
    }
}
