//! Error types for the connection pool.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shared by every closed-connection failure.
pub const CLOSED_MESSAGE: &str = "The connection is closed.";

/// Why a client-info property could not be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientInfoStatus {
    /// The property could not be set for an unknown reason.
    ReasonUnknown,
    /// The driver does not recognise the property name.
    ReasonUnknownProperty,
    /// The value is not valid for the property.
    ReasonValueInvalid,
    /// The value was too long and got truncated.
    ReasonValueTruncated,
}

impl fmt::Display for ClientInfoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ClientInfoStatus::ReasonUnknown => "reason unknown",
            ClientInfoStatus::ReasonUnknownProperty => "unknown property",
            ClientInfoStatus::ReasonValueInvalid => "invalid value",
            ClientInfoStatus::ReasonValueTruncated => "value truncated",
        };
        f.write_str(reason)
    }
}

/// All errors surfaced through the connection API.
///
/// Pool-level failures arrive wrapped in [`Error::AcquisitionFailed`] so the
/// original allocator error stays reachable through `source()`.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was attempted on a closed connection.
    #[error("{}", CLOSED_MESSAGE)]
    ConnectionClosed,

    /// `set_client_info` was called on a closed connection.
    ///
    /// Lists every property the caller tried to set.
    #[error("{} Client info properties not set: {}", CLOSED_MESSAGE, failed_names(.failed))]
    ClientInfo {
        failed: BTreeMap<String, ClientInfoStatus>,
        #[source]
        source: Box<Error>,
    },

    /// No connection became available within the claim timeout.
    #[error("timed out after {timeout:?} waiting for a connection from {data_source}")]
    AcquisitionTimeout {
        timeout: Duration,
        data_source: String,
    },

    /// The pool failed while trying to satisfy a claim.
    #[error("failed to acquire a pooled connection")]
    AcquisitionFailed(#[source] PoolError),

    /// The calling thread was interrupted while waiting for a connection.
    #[error("interrupted while waiting for a connection")]
    Interrupted,

    /// Nothing in the probe chain can be unwrapped to the requested type.
    #[error("found no wrapped implementation of {0}")]
    NotWrapped(&'static str),

    /// An argument was missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not supported by this driver or by the pool.
    #[error("not supported: {0}")]
    Unsupported(String),

    /// A vendor driver reported a failure.
    #[error("driver error: {0}")]
    Driver(String),

    /// I/O error while writing to a log sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::Unsupported`].
    pub fn unsupported(what: impl Into<String>) -> Self {
        Error::Unsupported(what.into())
    }

    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Error::InvalidArgument(what.into())
    }

    /// Build the closed-connection client-info failure for `names`.
    pub fn client_info_closed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let failed = names
            .into_iter()
            .map(|name| (name.into(), ClientInfoStatus::ReasonUnknown))
            .collect();
        Error::ClientInfo {
            failed,
            source: Box::new(Error::ConnectionClosed),
        }
    }

    /// True for [`Error::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }

    /// True for every failure caused by using a closed connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::ConnectionClosed | Error::ClientInfo { .. })
    }

    /// Failed properties of a [`Error::ClientInfo`], if this is one.
    pub fn failed_properties(&self) -> Option<&BTreeMap<String, ClientInfoStatus>> {
        match self {
            Error::ClientInfo { failed, .. } => Some(failed),
            _ => None,
        }
    }
}

fn failed_names(failed: &BTreeMap<String, ClientInfoStatus>) -> String {
    failed.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Failures raised by the pool engine itself.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The allocator failed to produce an object for this slot.
    #[error("allocation failed")]
    Allocation(#[source] Box<Error>),

    /// The claiming thread was interrupted.
    #[error("claim interrupted")]
    Interrupted,

    /// The pool has been shut down.
    #[error("pool is shut down")]
    ShutDown,
}
