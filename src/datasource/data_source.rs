//! The data source API: a factory of connections plus a few settings.

use std::any::{Any, TypeId};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::common::{Error, Result};
use crate::datasource::wrapper::{self, AsAny};
use crate::datasource::{Capabilities, Connection};

/// Shared, thread-safe diagnostic sink.
///
/// Clones write to the same underlying writer.
#[derive(Clone)]
pub struct LogWriter {
    inner: Arc<Mutex<dyn Write + Send>>,
}

impl LogWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write `line` plus a newline and flush.
    ///
    /// # Errors
    /// `Error::Io` if the underlying writer fails.
    pub fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.inner.lock();
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    /// Whether both handles write to the same sink.
    pub fn same_sink(&self, other: &LogWriter) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter")
            .field("sink", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// A factory of database connections.
///
/// Settings take `&self`: a data source is shared between threads, so
/// implementations keep their settings behind interior mutability.
pub trait DataSource: AsAny + Send + Sync {
    /// Open a new connection.
    fn get_connection(&self) -> Result<Box<dyn Connection>>;

    /// Open a connection as a specific user.
    ///
    /// Optional; the default fails with `Error::Unsupported`.
    fn get_connection_as(&self, user: &str, password: &str) -> Result<Box<dyn Connection>> {
        let _ = (user, password);
        Err(Error::unsupported("connections with caller-supplied credentials"))
    }

    fn log_writer(&self) -> Option<LogWriter>;

    fn set_log_writer(&self, writer: Option<LogWriter>) -> Result<()>;

    /// Maximum time to wait for a connection; `None` if never set.
    fn login_timeout(&self) -> Option<Duration>;

    fn set_login_timeout(&self, timeout: Duration) -> Result<()>;

    /// Name of the logger this source reports under.
    fn parent_logger(&self) -> Result<String> {
        Err(Error::unsupported("parent logger"))
    }

    /// Optional connection methods this source's connections implement.
    fn capabilities(&self) -> Capabilities {
        Capabilities::CORE
    }

    /// Objects this source wraps, for [`unwrap`](dyn DataSource::unwrap).
    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        let _ = ty;
        None
    }
}

impl dyn DataSource {
    /// Reach a `T` this data source is or wraps.
    ///
    /// # Errors
    /// `Error::NotWrapped` if nothing in the chain is a `T`.
    pub fn unwrap<T: Any>(&self) -> Result<&T> {
        wrapper::downcast(probe_data_source(self, TypeId::of::<T>()))
    }

    pub fn is_wrapper_for<T: Any>(&self) -> bool {
        probe_data_source(self, TypeId::of::<T>()).is_some()
    }
}

pub(crate) fn probe_data_source(ds: &dyn DataSource, ty: TypeId) -> Option<&dyn Any> {
    wrapper::first_match(ty, [ds.as_any()]).or_else(|| ds.probe(ty))
}
