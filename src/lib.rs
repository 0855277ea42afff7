//! InterchangeDB Pool - pooled database connections behind a data-source
//! facade.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      PooledDataSource                           │
//! │        get_connection / login timeout / log writer / unwrap     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        PooledConnection (lease, returns on close)        │   │
//! │  │                          ↓                               │   │
//! │  │   ConnectionProxy (closed/open, baseline reset)          │   │
//! │  │                          ↓                               │   │
//! │  │   ConnectionDelegate (adaptor-gated optional methods)    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↑ allocate / deallocate            │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Pool<ConnectionProxy> (pool/)                 │   │
//! │  │   idle stack + slots + allocator thread + expiration     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↑                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │   DataSourceAllocator → backing DataSource (driver)      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (SlotId, Error, config)
//! - [`pool`] - Generic bounded object pool
//! - [`datasource`] - Connection API, proxies and the pooled data source
//!
//! # Quick Start
//! ```ignore
//! use std::sync::Arc;
//! use interchangedb_pool::{Connection, PooledDataSource};
//!
//! let ds = PooledDataSource::new(Arc::new(my_driver_data_source))?;
//! let mut con = ds.get_connection()?;
//! con.set_auto_commit(false)?;
//! con.commit()?;
//! drop(con); // back to the pool
//! ```

pub mod common;
pub mod datasource;
pub mod pool;

#[cfg(test)]
mod test_support;

// Re-export commonly used items at crate root for convenience
pub use common::{ClientInfoStatus, Error, PoolError, Result, SlotId};

pub use datasource::{
    Capabilities, ClientInfo, Connection, ConnectionProxy, DataSource, DataSourceAllocator,
    DataSourceConfig, Holdability, LogWriter, PooledConnection, PooledDataSource, TypeMap,
};
pub use pool::{Interrupter, Pool, PoolStats, StatsSnapshot};
