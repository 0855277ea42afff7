//! The database connection API.
//!
//! [`Connection`] is the surface a vendor driver implements and the surface
//! the pool hands back to callers. Everything except [`Connection::is_closed`]
//! takes `&mut self` and returns a [`Result`], mirroring how drivers report
//! failure on every call.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::datasource::wrapper::{self, AsAny};

/// Custom SQL type name to application type name.
pub type TypeMap = HashMap<String, String>;

/// Client-info properties, such as `ApplicationName`.
pub type ClientInfo = HashMap<String, String>;

/// What happens to open cursors on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holdability {
    HoldCursorsOverCommit,
    CloseCursorsAtCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Options for creating statements. `holdability: None` means the
/// connection's current holdability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOptions {
    pub result_set_type: ResultSetType,
    pub concurrency: Concurrency,
    pub holdability: Option<Holdability>,
}

/// A transaction savepoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Savepoint {
    id: Option<u32>,
    name: Option<String>,
}

impl Savepoint {
    pub fn unnamed(id: u32) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A warning reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub sql_state: Option<String>,
    pub vendor_code: i32,
}

/// Static facts about the database behind a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMetadata {
    pub product_name: String,
    pub product_version: String,
    /// Holdability new connections start with.
    pub result_set_holdability: Holdability,
}

/// A statement created from a connection.
pub trait Statement: AsAny + Send {
    /// Execute `sql`, or the prepared SQL when `None`. Returns the update count.
    fn execute(&mut self, sql: Option<&str>) -> Result<u64>;

    fn close(&mut self) -> Result<()>;
}

/// A database connection.
///
/// Methods past the core set ([`schema`](Connection::schema) and friends)
/// are optional; drivers that do not support them keep the default, which
/// fails with `Error::Unsupported`.
pub trait Connection: AsAny + Send {
    // ========================================================================
    // Statements
    // ========================================================================

    fn create_statement(&mut self, options: StatementOptions) -> Result<Box<dyn Statement>>;

    fn prepare_statement(&mut self, sql: &str, options: StatementOptions) -> Result<Box<dyn Statement>>;

    fn prepare_call(&mut self, sql: &str, options: StatementOptions) -> Result<Box<dyn Statement>>;

    /// The driver's native form of `sql`.
    fn native_sql(&mut self, sql: &str) -> Result<String>;

    // ========================================================================
    // Transactions
    // ========================================================================

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()>;

    fn auto_commit(&mut self) -> Result<bool>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Create a savepoint; unnamed when `name` is `None`.
    fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint>;

    fn rollback_to(&mut self, savepoint: &Savepoint) -> Result<()>;

    fn release_savepoint(&mut self, savepoint: &Savepoint) -> Result<()>;

    fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<()>;

    fn transaction_isolation(&mut self) -> Result<IsolationLevel>;

    // ========================================================================
    // Session state
    // ========================================================================

    fn metadata(&mut self) -> Result<DatabaseMetadata>;

    fn set_read_only(&mut self, read_only: bool) -> Result<()>;

    fn is_read_only(&mut self) -> Result<bool>;

    fn set_catalog(&mut self, catalog: Option<&str>) -> Result<()>;

    fn catalog(&mut self) -> Result<Option<String>>;

    fn warnings(&mut self) -> Result<Vec<Warning>>;

    fn clear_warnings(&mut self) -> Result<()>;

    /// Current type map; `None` if the driver has none installed.
    fn type_map(&mut self) -> Result<Option<TypeMap>>;

    fn set_type_map(&mut self, map: Option<TypeMap>) -> Result<()>;

    fn set_holdability(&mut self, holdability: Holdability) -> Result<()>;

    fn holdability(&mut self) -> Result<Holdability>;

    /// Set one client-info property; `None` removes it.
    fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()>;

    /// Replace all client-info properties; `None` clears them.
    fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()>;

    fn client_info(&mut self, name: &str) -> Result<Option<String>>;

    /// All client-info properties; `None` if the driver reports none.
    fn client_info_all(&mut self) -> Result<Option<ClientInfo>>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Whether the connection still works, waiting at most `timeout`.
    fn is_valid(&mut self, timeout: Duration) -> Result<bool>;

    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    // ========================================================================
    // Optional
    // ========================================================================

    fn schema(&mut self) -> Result<Option<String>> {
        Err(Error::unsupported("schema"))
    }

    fn set_schema(&mut self, schema: Option<&str>) -> Result<()> {
        let _ = schema;
        Err(Error::unsupported("schema"))
    }

    /// Terminate the connection without waiting for the server.
    fn abort(&mut self) -> Result<()> {
        Err(Error::unsupported("abort"))
    }

    fn network_timeout(&mut self) -> Result<Duration> {
        Err(Error::unsupported("network timeout"))
    }

    fn set_network_timeout(&mut self, timeout: Duration) -> Result<()> {
        let _ = timeout;
        Err(Error::unsupported("network timeout"))
    }

    /// Objects this connection wraps, for [`unwrap`](dyn Connection::unwrap).
    ///
    /// Wrapping connections return the first candidate whose concrete type
    /// is `ty`. Plain drivers keep the default.
    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        let _ = ty;
        None
    }
}

impl dyn Connection {
    /// Reach a `T` this connection is or wraps.
    ///
    /// # Errors
    /// `Error::NotWrapped` if nothing in the chain is a `T`.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        wrapper::downcast(probe_connection(self, TypeId::of::<T>()))
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        probe_connection(self, TypeId::of::<T>()).is_some()
    }
}

/// Two-step probe: the connection's own concrete type, then its chain.
pub(crate) fn probe_connection(con: &dyn Connection, ty: TypeId) -> Option<&dyn Any> {
    wrapper::first_match(ty, [con.as_any()]).or_else(|| con.probe(ty))
}

/// Implements [`Connection`] methods by forwarding to `self.$target()?`.
///
/// `$target` is a method returning `Result<&mut X>` where `X` has methods of
/// the same names, so the closed check lives in one place.
macro_rules! forward_connection_methods {
    ($target:ident; $( fn $name:ident(&mut self $(, $arg:ident : $ty:ty)* ) -> $ret:ty; )*) => {
        $(
            fn $name(&mut self $(, $arg: $ty)*) -> $ret {
                self.$target()?.$name($($arg),*)
            }
        )*
    };
}

pub(crate) use forward_connection_methods;
