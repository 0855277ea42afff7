//! DataSourceAllocator - fills a pool with proxies over a data source.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::common::Result;
use crate::datasource::wrapper::AsAny;
use crate::datasource::{Adaptor, Capabilities, ConnectionProxy, DataSource};
use crate::pool::{Allocator, Slot};

/// Allocates [`ConnectionProxy`]s from connections of a [`DataSource`].
///
/// The adaptor is detected once, on the first connection opened: the
/// connection's optional getters are tried and the source's declared
/// capabilities are added.
pub struct DataSourceAllocator {
    data_source: Arc<dyn DataSource>,
    declared: Capabilities,
    adaptor: OnceLock<Adaptor>,
}

impl DataSourceAllocator {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        let declared = data_source.capabilities();
        Self {
            data_source,
            declared,
            adaptor: OnceLock::new(),
        }
    }

    /// Skip detection and wrap every connection with `adaptor`.
    pub fn with_adaptor(data_source: Arc<dyn DataSource>, adaptor: Adaptor) -> Self {
        Self {
            declared: adaptor.surface(),
            data_source,
            adaptor: OnceLock::from(adaptor),
        }
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// `None` until the first connection has been opened.
    pub fn adaptor(&self) -> Option<Adaptor> {
        self.adaptor.get().copied()
    }

    /// The adaptor's surface, or the declared capabilities before detection.
    pub fn capabilities(&self) -> Capabilities {
        self.adaptor().map_or(self.declared, |adaptor| adaptor.surface())
    }
}

impl Allocator<ConnectionProxy> for DataSourceAllocator {
    /// Open a connection and wrap it. Errors from the data source are
    /// returned unchanged.
    fn allocate(&self, slot: Slot<ConnectionProxy>) -> Result<ConnectionProxy> {
        let mut raw = self.data_source.get_connection()?;
        let adaptor = *self
            .adaptor
            .get_or_init(|| Adaptor::detect(self.declared.union(Capabilities::detect(&mut *raw))));
        ConnectionProxy::builder()
            .slot(slot)
            .delegate(adaptor.adapt(raw))
            .build()
    }

    /// Close the underlying driver connection.
    fn deallocate(&self, proxy: ConnectionProxy) -> Result<()> {
        tracing::trace!(slot = %proxy.slot_id(), "closing pooled connection");
        proxy.close_delegate()
    }
}

impl fmt::Debug for DataSourceAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceAllocator")
            .field("data_source", &AsAny::concrete_type_name(&*self.data_source))
            .field("adaptor", &self.adaptor().map(|adaptor| adaptor.name()))
            .finish()
    }
}
