//! Session state captured when a connection is first pooled.
//!
//! Each reuse of a pooled connection restores the state a caller may have
//! changed back to what the driver gave us at allocation.

use crate::common::Result;
use crate::datasource::{ClientInfo, Connection, Holdability, TypeMap};

/// A captured value, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured<V> {
    /// The driver does not support reading this value.
    Unsupported,
    /// The driver reported no value.
    Null,
    Value(V),
}

impl<V: Clone> Captured<V> {
    /// Capture the result of a driver getter.
    ///
    /// # Errors
    /// Errors other than `Error::Unsupported` are propagated.
    pub fn capture(read: Result<Option<V>>) -> Result<Self> {
        match read {
            Ok(Some(value)) => Ok(Captured::Value(value)),
            Ok(None) => Ok(Captured::Null),
            Err(err) if err.is_unsupported() => Ok(Captured::Unsupported),
            Err(err) => Err(err),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Captured::Unsupported)
    }

    /// Value to hand back to the driver on reset. Always a fresh copy, so
    /// the driver can never mutate the captured original.
    pub fn fresh_copy(&self) -> Option<V> {
        match self {
            Captured::Value(value) => Some(value.clone()),
            Captured::Null | Captured::Unsupported => None,
        }
    }
}

/// Allocation-time session state of one pooled connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub type_map: Captured<TypeMap>,
    pub client_info: Captured<ClientInfo>,
    pub holdability: Holdability,
}

impl Baseline {
    /// Read the baseline from a freshly opened connection.
    ///
    /// Holdability comes from the database metadata, which reports what
    /// new connections start with.
    ///
    /// # Errors
    /// Propagates driver errors other than `Error::Unsupported`.
    pub fn capture(con: &mut dyn Connection) -> Result<Self> {
        let type_map = Captured::capture(con.type_map())?;
        let client_info = Captured::capture(con.client_info_all())?;
        let holdability = con.metadata()?.result_set_holdability;
        Ok(Self {
            type_map,
            client_info,
            holdability,
        })
    }
}
