//! PooledDataSource - a data source that lends connections from a pool.
//!
//! ```text
//!   caller                PooledDataSource                 Pool<ConnectionProxy>
//!   ──────                ────────────────                 ─────────────────────
//!   get_connection() ───▶ claim(claim_timeout) ──────────▶ idle proxy
//!                         proxy.reopen()                   (or wait / time out)
//!   PooledConnection ◀─── wrap in lease
//!   close() / drop ─────────────────────────────────────▶ slot.release(proxy)
//! ```
//!
//! Settings (`set_login_timeout`, `set_log_writer`) write through to the
//! backing data source first and are only remembered locally once the
//! backing source has accepted them.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::common::{Error, PoolError, Result};
use crate::datasource::data_source::probe_data_source;
use crate::datasource::wrapper::{self, AsAny};
use crate::datasource::{
    Capabilities, Connection, ConnectionProxy, DataSource, DataSourceAllocator, DataSourceConfig,
    LogWriter, PooledConnection,
};
use crate::pool::{Completion, Pool, PoolStats};

/// A [`DataSource`] backed by a bounded pool of connections from another
/// data source.
///
/// # Thread Safety
/// - `settings`: `Mutex`, held across the write-through so concurrent
///   setters apply in one order to both the backing source and here
/// - `claim_timeout`: atomic, read without locking on every claim
/// - `pool`: internally synchronised
pub struct PooledDataSource {
    data_source: Arc<dyn DataSource>,
    allocator: Arc<DataSourceAllocator>,
    pool: Pool<ConnectionProxy>,
    settings: Mutex<Settings>,
    claim_timeout: ClaimTimeout,
}

struct Settings {
    log_writer: Option<LogWriter>,
    login_timeout: Option<Duration>,
}

/// Claim timeout in nanoseconds.
///
/// Stored with `Release` after the write-through succeeds and loaded with
/// `Acquire`, so a claim that sees a new timeout also sees it applied to the
/// backing source.
struct ClaimTimeout {
    nanos: AtomicU64,
}

impl ClaimTimeout {
    fn new(timeout: Duration) -> Self {
        let this = Self {
            nanos: AtomicU64::new(0),
        };
        this.store(timeout);
        this
    }

    fn load(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    fn store(&self, timeout: Duration) {
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(nanos, Ordering::Release);
    }
}

impl PooledDataSource {
    /// Pool connections from `data_source` with default settings.
    ///
    /// # Errors
    /// `Error::Io` if the pool's allocator thread cannot be started.
    pub fn new(data_source: Arc<dyn DataSource>) -> Result<Self> {
        Self::from_config(DataSourceConfig::new().with_data_source(data_source))
    }

    /// Build from an explicit configuration.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the config does not validate
    /// - `Error::Io` if the pool's allocator thread cannot be started
    pub fn from_config(config: DataSourceConfig) -> Result<Self> {
        config.validate()?;
        let data_source = config
            .data_source()
            .cloned()
            .ok_or_else(|| Error::invalid_argument("a data source is required"))?;

        let allocator = Arc::new(DataSourceAllocator::new(Arc::clone(&data_source)));
        let pool = Pool::new(config.pool_config_for(Arc::clone(&allocator)))?;

        tracing::info!(
            data_source = AsAny::concrete_type_name(&*data_source),
            size = config.pool_size(),
            declared = ?data_source.capabilities(),
            "pooled data source ready"
        );

        Ok(Self {
            data_source,
            allocator,
            pool,
            settings: Mutex::new(Settings {
                log_writer: None,
                login_timeout: None,
            }),
            claim_timeout: ClaimTimeout::new(config.claim_timeout()),
        })
    }

    // ========================================================================
    // Public API: Connections
    // ========================================================================

    /// Claim a pooled connection.
    ///
    /// Waits up to the login timeout, or the configured claim timeout if no
    /// login timeout has been set. A zero login timeout does not wait.
    ///
    /// # Errors
    /// - `Error::AcquisitionTimeout` if no connection frees up in time
    /// - `Error::Interrupted` if the calling thread is interrupted while
    ///   waiting (see [`Interrupter`](crate::Interrupter))
    /// - `Error::AcquisitionFailed` for any other pool failure; an allocator
    ///   error is its source
    /// - Driver errors from resetting the claimed connection, which is then
    ///   discarded
    pub fn get_connection(&self) -> Result<PooledConnection> {
        let timeout = self.claim_timeout.load();
        let claimed = self.pool.claim(timeout).map_err(|err| match err {
            PoolError::Interrupted => Error::Interrupted,
            other => Error::AcquisitionFailed(other),
        })?;

        let Some(mut proxy) = claimed else {
            tracing::debug!(?timeout, "timed out waiting for a pooled connection");
            return Err(Error::AcquisitionTimeout {
                timeout,
                data_source: AsAny::concrete_type_name(&*self.data_source).to_string(),
            });
        };

        if let Err(err) = proxy.reopen() {
            tracing::warn!(slot = %proxy.slot_id(), error = %err, "failed to reset pooled connection; discarding it");
            proxy.discard();
            return Err(err);
        }

        Ok(PooledConnection::new(proxy))
    }

    /// Reach this source, its backing source, the pool, the allocator, or
    /// anything the backing source wraps.
    ///
    /// # Errors
    /// `Error::NotWrapped` if nothing in the chain is a `T`.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        wrapper::downcast(probe_data_source(self, TypeId::of::<T>()))
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        probe_data_source(self, TypeId::of::<T>()).is_some()
    }

    // ========================================================================
    // Public API: Introspection
    // ========================================================================

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    pub fn pool(&self) -> &Pool<ConnectionProxy> {
        &self.pool
    }

    pub fn allocator(&self) -> &DataSourceAllocator {
        &self.allocator
    }

    /// Timeout the next `get_connection` will use.
    pub fn claim_timeout(&self) -> Duration {
        self.claim_timeout.load()
    }

    pub fn stats(&self) -> &PoolStats {
        self.pool.stats()
    }

    /// Shut the pool down. Connections still leased are closed when they
    /// are returned.
    pub fn shutdown(&self) -> Completion<ConnectionProxy> {
        self.pool.shutdown()
    }
}

impl DataSource for PooledDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        let con = PooledDataSource::get_connection(self)?;
        Ok(Box::new(con))
    }

    /// Always `Error::Unsupported`: pooled connections share one identity.
    fn get_connection_as(&self, _user: &str, _password: &str) -> Result<Box<dyn Connection>> {
        Err(Error::unsupported(
            "connections with caller-supplied credentials are not pooled",
        ))
    }

    fn log_writer(&self) -> Option<LogWriter> {
        self.settings.lock().log_writer.clone()
    }

    fn set_log_writer(&self, writer: Option<LogWriter>) -> Result<()> {
        let mut settings = self.settings.lock();
        self.data_source.set_log_writer(writer.clone())?;
        settings.log_writer = writer;
        Ok(())
    }

    /// `None` until set; the claim timeout then falls back to the configured
    /// default.
    fn login_timeout(&self) -> Option<Duration> {
        self.settings.lock().login_timeout
    }

    fn set_login_timeout(&self, timeout: Duration) -> Result<()> {
        let mut settings = self.settings.lock();
        self.data_source.set_login_timeout(timeout)?;
        settings.login_timeout = Some(timeout);
        self.claim_timeout.store(timeout);
        tracing::debug!(?timeout, "login timeout updated");
        Ok(())
    }

    fn parent_logger(&self) -> Result<String> {
        Err(Error::unsupported("parent logger"))
    }

    fn capabilities(&self) -> Capabilities {
        self.allocator.capabilities()
    }

    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        let backing: &dyn DataSource = &*self.data_source;
        let candidates: [&dyn Any; 3] = [
            backing.as_any(),
            &self.pool,
            &*self.allocator,
        ];
        wrapper::first_match(ty, candidates).or_else(|| backing.probe(ty))
    }
}

impl fmt::Debug for PooledDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledDataSource")
            .field("data_source", &AsAny::concrete_type_name(&*self.data_source))
            .field("pool", &self.pool)
            .field("claim_timeout", &self.claim_timeout.load())
            .finish()
    }
}
