//! Pooled data source.
//!
//! Connection-level types built on top of the [`pool`](crate::pool) engine.
//!
//! # Components
//! - [`Connection`] / [`DataSource`] - Driver-facing traits
//! - [`ConnectionProxy`] - Pooled connection with close/reopen state machine
//! - [`PooledConnection`] - The caller's lease; returns the proxy on close
//! - [`DataSourceAllocator`] - Pool allocator over a backing data source
//! - [`PooledDataSource`] - Data-source facade over the pool
//! - [`Adaptor`] - Per-driver optional-method surface

mod adaptor;
mod allocator;
pub mod baseline;
mod config;
pub(crate) mod connection;
mod data_source;
mod facade;
mod pooled_connection;
mod proxy;
pub mod wrapper;

pub use adaptor::{Adaptor, Capabilities, ConnectionDelegate};
pub use allocator::DataSourceAllocator;
pub use baseline::{Baseline, Captured};
pub use config::DataSourceConfig;
pub use connection::{
    ClientInfo, Concurrency, Connection, DatabaseMetadata, Holdability, IsolationLevel,
    ResultSetType, Savepoint, Statement, StatementOptions, TypeMap, Warning,
};
pub use data_source::{DataSource, LogWriter};
pub use facade::PooledDataSource;
pub use pooled_connection::PooledConnection;
pub use proxy::{ConnectionProxy, ConnectionProxyBuilder};
pub use wrapper::AsAny;
