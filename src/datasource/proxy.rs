//! ConnectionProxy - the pooled object wrapping one driver connection.
//!
//! ```text
//!          allocate                 claim + reopen()
//!  driver ──────────▶ [open/idle] ─────────────────▶ [open, leased]
//!                         ▲                                │
//!                         │ slot.release                   │ close() / drop
//!                         └─────── [closed, in pool] ◀─────┘
//! ```
//!
//! Closing hands the driver connection back to the slot exactly once,
//! rolling back a transaction left open. The caller keeps an empty, closed
//! proxy: every operation except `close`, `is_closed`, `is_valid` and the
//! probes fails with `Error::ConnectionClosed`. Dropping a proxy that was
//! never closed closes it. `reopen` is the only transition back to open,
//! and it resets the session state a previous caller may have changed.

use std::any::{Any, TypeId};
use std::fmt;
use std::time::Duration;

use crate::common::{Error, Result, SlotId};
use crate::datasource::baseline::Baseline;
use crate::datasource::connection::{forward_connection_methods, probe_connection};
use crate::datasource::wrapper;
use crate::datasource::{
    ClientInfo, Connection, ConnectionDelegate, DatabaseMetadata, Holdability, IsolationLevel,
    Savepoint, Statement, StatementOptions, TypeMap, Warning,
};
use crate::pool::Slot;

/// A pooled driver connection with a closed/open state machine.
///
/// Created by the [`DataSourceAllocator`](super::DataSourceAllocator) and
/// lent to callers inside a [`PooledConnection`](super::PooledConnection).
pub struct ConnectionProxy {
    slot: Slot<ConnectionProxy>,
    /// `None` once the connection has been handed back to the slot.
    delegate: Option<ConnectionDelegate>,
    baseline: Baseline,
    closed: bool,
    touched_type_map: bool,
    touched_client_info: bool,
}

/// Builder for [`ConnectionProxy`]; both the slot and the delegate are
/// required.
#[derive(Default)]
pub struct ConnectionProxyBuilder {
    slot: Option<Slot<ConnectionProxy>>,
    delegate: Option<ConnectionDelegate>,
}

impl ConnectionProxyBuilder {
    pub fn slot(mut self, slot: Slot<ConnectionProxy>) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn delegate(mut self, delegate: ConnectionDelegate) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Capture the delegate's baseline and build an open proxy.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the slot or delegate is missing
    /// - Driver errors from reading the baseline
    pub fn build(self) -> Result<ConnectionProxy> {
        let slot = self
            .slot
            .ok_or_else(|| Error::invalid_argument("the slot parameter is required"))?;
        let mut delegate = self
            .delegate
            .ok_or_else(|| Error::invalid_argument("the delegate parameter is required"))?;
        let baseline = Baseline::capture(delegate.raw_mut())?;

        Ok(ConnectionProxy {
            slot,
            delegate: Some(delegate),
            baseline,
            closed: false,
            touched_type_map: false,
            touched_client_info: false,
        })
    }
}

impl ConnectionProxy {
    pub fn builder() -> ConnectionProxyBuilder {
        ConnectionProxyBuilder::default()
    }

    #[inline]
    pub fn slot_id(&self) -> SlotId {
        self.slot.id()
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// The adapted driver connection; `None` once closed by a caller.
    pub fn delegate(&self) -> Option<&ConnectionDelegate> {
        self.delegate.as_ref()
    }

    /// The driver connection; `None` once closed by a caller.
    pub fn raw(&self) -> Option<&(dyn Connection + 'static)> {
        self.delegate.as_ref().map(ConnectionDelegate::raw)
    }

    /// Reach the proxy itself or anything the driver connection is or wraps.
    ///
    /// # Errors
    /// `Error::NotWrapped` if nothing in the chain is a `T`.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        wrapper::downcast(probe_connection(self, TypeId::of::<T>()))
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        probe_connection(self, TypeId::of::<T>()).is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Make the proxy usable again and reset the session state.
    ///
    /// Auto-commit goes back on, warnings are cleared and holdability
    /// returns to the baseline. The type map and client info are restored
    /// only if a caller read or changed them since the last reopen.
    ///
    /// # Errors
    /// - `Error::ConnectionClosed` if the connection was already handed back
    /// - Any driver error; the connection should then be discarded
    pub fn reopen(&mut self) -> Result<()> {
        let con = self
            .delegate
            .as_mut()
            .map(ConnectionDelegate::raw_mut)
            .ok_or(Error::ConnectionClosed)?;
        self.closed = false;
        con.set_auto_commit(true)?;
        con.clear_warnings()?;
        con.set_holdability(self.baseline.holdability)?;

        if self.touched_type_map && self.baseline.type_map.is_supported() {
            con.set_type_map(self.baseline.type_map.fresh_copy())?;
        }
        if self.touched_client_info {
            con.set_client_info_all(self.baseline.client_info.fresh_copy())?;
        }

        tracing::debug!(
            slot = %self.slot.id(),
            type_map = self.touched_type_map,
            client_info = self.touched_client_info,
            "connection reopened"
        );
        self.touched_type_map = false;
        self.touched_client_info = false;
        Ok(())
    }

    /// Hand the connection back to the slot for reuse. No-op once done.
    ///
    /// A transaction left open with auto-commit off is rolled back first.
    /// If that fails the connection is discarded instead of reused.
    fn hand_back(&mut self) {
        let pending = self.roll_back_pending();
        self.closed = true;
        let Some(returned) = self.detach() else {
            return;
        };
        match pending {
            Ok(()) => self.slot.release(returned),
            Err(err) => {
                tracing::warn!(slot = %self.slot.id(), error = %err, "rollback on close failed; discarding connection");
                self.slot.discard(returned);
            }
        }
    }

    /// Close and retire the proxy so the pool replaces it.
    pub(crate) fn discard(mut self) {
        self.closed = true;
        if let Some(returned) = self.detach() {
            self.slot.discard(returned);
        }
    }

    /// Close the driver connection. Used at deallocation.
    pub(crate) fn close_delegate(mut self) -> Result<()> {
        self.closed = true;
        match self.delegate.take() {
            Some(mut delegate) => delegate.raw_mut().close(),
            None => Ok(()),
        }
    }

    /// Move the driver connection into a closed proxy for the slot, leaving
    /// this one empty.
    fn detach(&mut self) -> Option<ConnectionProxy> {
        let delegate = self.delegate.take()?;
        Some(ConnectionProxy {
            slot: self.slot.clone(),
            delegate: Some(delegate),
            baseline: self.baseline.clone(),
            closed: true,
            touched_type_map: self.touched_type_map,
            touched_client_info: self.touched_client_info,
        })
    }

    fn roll_back_pending(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let Some(delegate) = self.delegate.as_mut() else {
            return Ok(());
        };
        let con = delegate.raw_mut();
        if !con.auto_commit()? {
            con.rollback()?;
        }
        Ok(())
    }

    fn open(&mut self) -> Result<&mut (dyn Connection + 'static)> {
        self.gated().map(ConnectionDelegate::raw_mut)
    }

    fn gated(&mut self) -> Result<&mut ConnectionDelegate> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.delegate.as_mut().ok_or(Error::ConnectionClosed)
    }
}

impl Connection for ConnectionProxy {
    forward_connection_methods! { open;
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
        fn set_holdability(&mut self, holdability: Holdability) -> Result<()>;
        fn holdability(&mut self) -> Result<Holdability>;
        fn client_info(&mut self, name: &str) -> Result<Option<String>>;
    }

    forward_connection_methods! { gated;
        fn schema(&mut self) -> Result<Option<String>>;
        fn set_schema(&mut self, schema: Option<&str>) -> Result<()>;
        fn abort(&mut self) -> Result<()>;
        fn network_timeout(&mut self) -> Result<Duration>;
        fn set_network_timeout(&mut self, timeout: Duration) -> Result<()>;
    }

    fn type_map(&mut self) -> Result<Option<TypeMap>> {
        let con = self.open()?;
        let map = con.type_map();
        self.touched_type_map = true;
        map
    }

    fn set_type_map(&mut self, map: Option<TypeMap>) -> Result<()> {
        let con = self.open()?;
        let result = con.set_type_map(map);
        self.touched_type_map = true;
        result
    }

    fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        if self.closed {
            return Err(Error::client_info_closed([name]));
        }
        self.touched_client_info = true;
        self.open()?.set_client_info(name, value)
    }

    fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()> {
        if self.closed {
            let names = properties.into_iter().flat_map(|props| props.into_keys());
            return Err(Error::client_info_closed(names));
        }
        self.touched_client_info = true;
        self.open()?.set_client_info_all(properties)
    }

    fn client_info_all(&mut self) -> Result<Option<ClientInfo>> {
        let con = self.open()?;
        let info = con.client_info_all();
        self.touched_client_info = true;
        info
    }

    fn is_valid(&mut self, timeout: Duration) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.open()?.is_valid(timeout)
    }

    /// Return the connection to the pool. The driver connection stays open
    /// for the next caller. Idempotent.
    fn close(&mut self) -> Result<()> {
        self.hand_back();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        probe_connection(self.raw()?, ty)
    }
}

impl Drop for ConnectionProxy {
    fn drop(&mut self) {
        if self.delegate.is_none() {
            return;
        }
        if self.slot.is_attached() {
            self.hand_back();
        } else if let Some(mut delegate) = self.delegate.take() {
            tracing::debug!(slot = %self.slot.id(), "pool is gone; closing driver connection");
            if let Err(err) = delegate.raw_mut().close() {
                tracing::warn!(slot = %self.slot.id(), error = %err, "failed to close driver connection");
            }
        }
    }
}

impl fmt::Debug for ConnectionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProxy")
            .field("slot", &self.slot.id())
            .field("driver", &self.raw().map(|raw| raw.concrete_type_name()))
            .field("closed", &self.closed)
            .field("touched_type_map", &self.touched_type_map)
            .field("touched_client_info", &self.touched_client_info)
            .finish()
    }
}
