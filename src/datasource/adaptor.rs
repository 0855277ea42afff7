//! Driver capability adaptation.
//!
//! Drivers differ in which optional [`Connection`] methods they implement.
//! The [`Adaptor`] for a data source is chosen once, from the first
//! connection it opens: each optional getter is called once and a getter
//! answering `Error::Unsupported` marks its group absent. Whatever the source
//! declares is added on top. The result picks an adaptor from a small
//! registry keyed by capability set, and every connection from that source
//! is then wrapped in a [`ConnectionDelegate`] exposing exactly that
//! adaptor's optional surface: methods outside it fail with
//! `Error::Unsupported` without reaching the driver.

use std::time::Duration;

use crate::common::{Error, Result};
use crate::datasource::Connection;

/// Which optional connection methods are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    pub schema: bool,
    pub abort: bool,
    pub network_timeout: bool,
}

impl Capabilities {
    /// Core methods only.
    pub const CORE: Capabilities = Capabilities {
        schema: false,
        abort: false,
        network_timeout: false,
    };

    /// Core plus every optional method.
    pub const EXTENDED: Capabilities = Capabilities {
        schema: true,
        abort: true,
        network_timeout: true,
    };

    /// Ask a live connection which optional groups it implements.
    ///
    /// Only getters are called. Abort has no side-effect-free check, so it
    /// is assumed present when both other groups are, as drivers add them
    /// together.
    pub fn detect(con: &mut dyn Connection) -> Capabilities {
        let schema = !matches!(con.schema(), Err(ref err) if err.is_unsupported());
        let network_timeout = !matches!(con.network_timeout(), Err(ref err) if err.is_unsupported());
        Capabilities {
            schema,
            abort: schema && network_timeout,
            network_timeout,
        }
    }

    /// Capabilities present in either set.
    pub fn union(self, other: Capabilities) -> Capabilities {
        Capabilities {
            schema: self.schema || other.schema,
            abort: self.abort || other.abort,
            network_timeout: self.network_timeout || other.network_timeout,
        }
    }

    /// Whether every capability in `other` is also in `self`.
    pub fn contains(&self, other: Capabilities) -> bool {
        (self.schema || !other.schema)
            && (self.abort || !other.abort)
            && (self.network_timeout || !other.network_timeout)
    }
}

/// Wraps raw driver connections for one capability surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adaptor {
    name: &'static str,
    surface: Capabilities,
}

/// Richest surface first.
const REGISTRY: [Adaptor; 2] = [
    Adaptor {
        name: "extended",
        surface: Capabilities::EXTENDED,
    },
    Adaptor {
        name: "core",
        surface: Capabilities::CORE,
    },
];

impl Adaptor {
    /// Pick the richest registered adaptor the detected capabilities cover.
    ///
    /// A driver that only partly implements a surface gets the next one
    /// down.
    pub fn detect(detected: Capabilities) -> Adaptor {
        let adaptor = REGISTRY
            .iter()
            .copied()
            .find(|adaptor| detected.contains(adaptor.surface))
            .unwrap_or(REGISTRY[REGISTRY.len() - 1]);
        tracing::debug!(adaptor = adaptor.name, ?detected, "selected connection adaptor");
        adaptor
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn surface(&self) -> Capabilities {
        self.surface
    }

    /// Wrap a raw driver connection.
    pub fn adapt(&self, raw: Box<dyn Connection>) -> ConnectionDelegate {
        ConnectionDelegate {
            raw,
            surface: self.surface,
        }
    }
}

/// A raw driver connection behind an adaptor's capability surface.
pub struct ConnectionDelegate {
    raw: Box<dyn Connection>,
    surface: Capabilities,
}

impl ConnectionDelegate {
    pub fn raw(&self) -> &(dyn Connection + 'static) {
        &*self.raw
    }

    pub fn raw_mut(&mut self) -> &mut (dyn Connection + 'static) {
        &mut *self.raw
    }

    pub fn surface(&self) -> Capabilities {
        self.surface
    }

    pub fn into_raw(self) -> Box<dyn Connection> {
        self.raw
    }

    fn require(&self, available: bool, what: &str) -> Result<()> {
        if available {
            Ok(())
        } else {
            Err(Error::unsupported(format!("{what} is not supported by this driver")))
        }
    }

    pub fn schema(&mut self) -> Result<Option<String>> {
        self.require(self.surface.schema, "schema")?;
        self.raw.schema()
    }

    pub fn set_schema(&mut self, schema: Option<&str>) -> Result<()> {
        self.require(self.surface.schema, "schema")?;
        self.raw.set_schema(schema)
    }

    pub fn abort(&mut self) -> Result<()> {
        self.require(self.surface.abort, "abort")?;
        self.raw.abort()
    }

    pub fn network_timeout(&mut self) -> Result<Duration> {
        self.require(self.surface.network_timeout, "network timeout")?;
        self.raw.network_timeout()
    }

    pub fn set_network_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.require(self.surface.network_timeout, "network timeout")?;
        self.raw.set_network_timeout(timeout)
    }
}
