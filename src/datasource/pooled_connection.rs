//! PooledConnection - the caller's lease on a pooled connection.

use std::any::{Any, TypeId};
use std::fmt;
use std::time::Duration;

use crate::common::{Error, Result, SlotId};
use crate::datasource::connection::{forward_connection_methods, probe_connection};
use crate::datasource::wrapper;
use crate::datasource::{
    ClientInfo, Connection, ConnectionProxy, DatabaseMetadata, Holdability, IsolationLevel,
    Savepoint, Statement, StatementOptions, TypeMap, Warning,
};

/// A connection claimed from a [`PooledDataSource`](super::PooledDataSource).
///
/// Closing the lease (explicitly or by dropping it) closes the proxy and
/// returns it to the pool exactly once; the driver connection stays open for
/// the next caller. After that, the lease behaves like any closed
/// connection.
///
/// ```ignore
/// let mut con = data_source.get_connection()?;
/// con.set_auto_commit(false)?;
/// // ...
/// con.commit()?;
/// con.close()?; // or just drop it
/// ```
pub struct PooledConnection {
    proxy: Option<ConnectionProxy>,
}

impl PooledConnection {
    pub(crate) fn new(proxy: ConnectionProxy) -> Self {
        Self { proxy: Some(proxy) }
    }

    /// Slot of the underlying proxy; `None` once closed.
    pub fn slot_id(&self) -> Option<SlotId> {
        self.proxy.as_ref().map(ConnectionProxy::slot_id)
    }

    /// Reach the lease, its proxy, or anything the driver connection is or
    /// wraps.
    ///
    /// # Errors
    /// `Error::NotWrapped` if nothing is a `T`. A closed lease only matches
    /// itself.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        wrapper::downcast(probe_connection(self, TypeId::of::<T>()))
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        probe_connection(self, TypeId::of::<T>()).is_some()
    }

    fn lease(&mut self) -> Result<&mut ConnectionProxy> {
        self.proxy.as_mut().ok_or(Error::ConnectionClosed)
    }
}

impl Connection for PooledConnection {
    forward_connection_methods! { lease;
        fn create_statement(&mut self, options: StatementOptions) -> Result<Box<dyn Statement>>;
        fn prepare_statement(&mut self, sql: &str, options: StatementOptions) -> Result<Box<dyn Statement>>;
        fn prepare_call(&mut self, sql: &str, options: StatementOptions) -> Result<Box<dyn Statement>>;
        fn native_sql(&mut self, sql: &str) -> Result<String>;
        fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()>;
        fn auto_commit(&mut self) -> Result<bool>;
        fn commit(&mut self) -> Result<()>;
        fn rollback(&mut self) -> Result<()>;
        fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint>;
        fn rollback_to(&mut self, savepoint: &Savepoint) -> Result<()>;
        fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<()>;
        fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<()>;
        fn transaction_isolation(&mut self) -> Result<IsolationLevel>;
        fn metadata(&mut self) -> Result<DatabaseMetadata>;
        fn set_read_only(&mut self, read_only: bool) -> Result<()>;
        fn is_read_only(&mut self) -> Result<bool>;
        fn set_catalog(&mut self, catalog: Option<&str>) -> Result<()>;
        fn catalog(&mut self) -> Result<Option<String>>;
        fn warnings(&mut self) -> Result<Vec<Warning>>;
        fn clear_warnings(&mut self) -> Result<()>;
        fn type_map(&mut self) -> Result<Option<TypeMap>>;
        fn set_type_map(&mut self, map: Option<TypeMap>) -> Result<()>;
        fn set_holdability(&mut self, holdability: Holdability) -> Result<()>;
        fn holdability(&mut self) -> Result<Holdability>;
        fn client_info(&mut self, name: &str) -> Result<Option<String>>;
        fn client_info_all(&mut self) -> Result<Option<ClientInfo>>;
        fn schema(&mut self) -> Result<Option<String>>;
        fn set_schema(&mut self, schema: Option<&str>) -> Result<()>;
        fn abort(&mut self) -> Result<()>;
        fn network_timeout(&mut self) -> Result<Duration>;
        fn set_network_timeout(&mut self, timeout: Duration) -> Result<()>;
    }

    fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match self.proxy.as_mut() {
            Some(proxy) => proxy.set_client_info(name, value),
            None => Err(Error::client_info_closed([name])),
        }
    }

    fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()> {
        match self.proxy.as_mut() {
            Some(proxy) => proxy.set_client_info_all(properties),
            None => {
                let names = properties.into_iter().flat_map(|props| props.into_keys());
                Err(Error::client_info_closed(names))
            }
        }
    }

    fn is_valid(&mut self, timeout: Duration) -> Result<bool> {
        match self.proxy.as_mut() {
            Some(proxy) => proxy.is_valid(timeout),
            None => Ok(false),
        }
    }

    /// Return the connection to the pool. Idempotent.
    fn close(&mut self) -> Result<()> {
        if let Some(mut proxy) = self.proxy.take() {
            tracing::trace!(slot = %proxy.slot_id(), "returning connection to pool");
            proxy.close()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.proxy.as_ref().map_or(true, |proxy| proxy.is_closed())
    }

    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        let proxy = self.proxy.as_ref()?;
        wrapper::first_match(ty, [proxy as &dyn Any]).or_else(|| proxy.probe(ty))
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("proxy", &self.proxy)
            .finish()
    }
}
