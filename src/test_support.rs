//! Scripted fakes shared by the unit tests.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::common::{Error, Result, SlotId};
use crate::datasource::connection::forward_connection_methods;
use crate::datasource::{
    Capabilities, ClientInfo, Connection, DataSource, DatabaseMetadata, Holdability,
    IsolationLevel, LogWriter, Savepoint, Statement, StatementOptions, TypeMap, Warning,
};
use crate::pool::slot::Reclaim;
use crate::pool::Slot;

// ============================================================================
// Slot sink
// ============================================================================

/// Records what gets released and discarded through its slots.
pub(crate) struct CaptureSink<T> {
    released: Mutex<Vec<(SlotId, T)>>,
    discarded: Mutex<Vec<(SlotId, T)>>,
}

impl<T: Send + 'static> CaptureSink<T> {
    pub(crate) fn new() -> Self {
        Self {
            released: Mutex::new(Vec::new()),
            discarded: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn slot(self: &Arc<Self>, id: SlotId) -> Slot<T> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let sink: Weak<dyn Reclaim<T>> = weak;
        Slot::new(id, sink)
    }

    pub(crate) fn take_released(&self) -> Vec<(SlotId, T)> {
        std::mem::take(&mut *self.released.lock())
    }

    pub(crate) fn take_discarded(&self) -> Vec<(SlotId, T)> {
        std::mem::take(&mut *self.discarded.lock())
    }
}

impl<T: Clone + Send + 'static> CaptureSink<T> {
    pub(crate) fn released(&self) -> Vec<(SlotId, T)> {
        self.released.lock().clone()
    }

    pub(crate) fn discarded(&self) -> Vec<(SlotId, T)> {
        self.discarded.lock().clone()
    }
}

impl<T: Send + 'static> Reclaim<T> for CaptureSink<T> {
    fn release(&self, id: SlotId, obj: T) {
        self.released.lock().push((id, obj));
    }

    fn discard(&self, id: SlotId, obj: T) {
        self.discarded.lock().push((id, obj));
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Driver calls worth asserting on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Commit,
    Rollback,
    SetAutoCommit(bool),
    ClearWarnings,
    SetHoldability(Holdability),
    SetTypeMap(Option<TypeMap>),
    SetClientInfo(String, Option<String>),
    SetClientInfoAll(Option<ClientInfo>),
    IsValid,
    Close,
    Other(&'static str),
}

/// Observable state behind a [`FakeConnection`].
pub(crate) struct FakeState {
    pub calls: Vec<Call>,
    pub auto_commit: bool,
    pub holdability: Holdability,
    pub default_holdability: Holdability,
    pub type_map: Option<TypeMap>,
    pub type_map_supported: bool,
    pub client_info: Option<ClientInfo>,
    pub client_info_supported: bool,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    /// `None` makes the network timeout getter unsupported.
    pub network_timeout: Option<Duration>,
    pub warnings: Vec<Warning>,
    pub read_only: bool,
    pub isolation: IsolationLevel,
    pub valid: bool,
    pub closed: bool,
    /// Every call except `close` fails with this driver message.
    pub fail_with: Option<String>,
    pub fail_rollback: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            auto_commit: true,
            holdability: Holdability::HoldCursorsOverCommit,
            default_holdability: Holdability::HoldCursorsOverCommit,
            type_map: None,
            type_map_supported: true,
            client_info: None,
            client_info_supported: true,
            catalog: None,
            schema: None,
            network_timeout: None,
            warnings: Vec::new(),
            read_only: false,
            isolation: IsolationLevel::ReadCommitted,
            valid: true,
            closed: false,
            fail_with: None,
            fail_rollback: false,
        }
    }
}

pub(crate) struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnection {
    pub(crate) fn new() -> (Self, Arc<Mutex<FakeState>>) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// Record `call` and fail if the script says so.
    fn call(&self, call: Call) -> Result<parking_lot::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if let Some(message) = &state.fail_with {
            return Err(Error::Driver(message.clone()));
        }
        Ok(state)
    }
}

struct FakeStatement;

impl Statement for FakeStatement {
    fn execute(&mut self, _sql: Option<&str>) -> Result<u64> {
        Ok(1)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Connection for FakeConnection {
    fn create_statement(&mut self, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        self.call(Call::Other("create_statement"))?;
        Ok(Box::new(FakeStatement))
    }

    fn prepare_statement(&mut self, _sql: &str, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        self.call(Call::Other("prepare_statement"))?;
        Ok(Box::new(FakeStatement))
    }

    fn prepare_call(&mut self, _sql: &str, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        self.call(Call::Other("prepare_call"))?;
        Ok(Box::new(FakeStatement))
    }

    fn native_sql(&mut self, sql: &str) -> Result<String> {
        self.call(Call::Other("native_sql"))?;
        Ok(sql.to_string())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        self.call(Call::SetAutoCommit(auto_commit))?.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<bool> {
        Ok(self.call(Call::Other("auto_commit"))?.auto_commit)
    }

    fn commit(&mut self) -> Result<()> {
        self.call(Call::Commit)?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let state = self.call(Call::Rollback)?;
        if state.fail_rollback {
            return Err(Error::Driver("rollback failed".into()));
        }
        Ok(())
    }

    fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint> {
        self.call(Call::Other("set_savepoint"))?;
        Ok(match name {
            Some(name) => Savepoint::named(name),
            None => Savepoint::unnamed(1),
        })
    }

    fn rollback_to(&mut self, _savepoint: &Savepoint) -> Result<()> {
        self.call(Call::Other("rollback_to"))?;
        Ok(())
    }

    fn release_savepoint(&mut self, _savepoint: &Savepoint) -> Result<()> {
        self.call(Call::Other("release_savepoint"))?;
        Ok(())
    }

    fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<()> {
        self.call(Call::Other("set_transaction_isolation"))?.isolation = level;
        Ok(())
    }

    fn transaction_isolation(&mut self) -> Result<IsolationLevel> {
        Ok(self.call(Call::Other("transaction_isolation"))?.isolation)
    }

    fn metadata(&mut self) -> Result<DatabaseMetadata> {
        let state = self.call(Call::Other("metadata"))?;
        Ok(DatabaseMetadata {
            product_name: "FakeDB".into(),
            product_version: "1.0".into(),
            result_set_holdability: state.default_holdability,
        })
    }

    fn set_read_only(&mut self, read_only: bool) -> Result<()> {
        self.call(Call::Other("set_read_only"))?.read_only = read_only;
        Ok(())
    }

    fn is_read_only(&mut self) -> Result<bool> {
        Ok(self.call(Call::Other("is_read_only"))?.read_only)
    }

    fn set_catalog(&mut self, catalog: Option<&str>) -> Result<()> {
        self.call(Call::Other("set_catalog"))?.catalog = catalog.map(str::to_string);
        Ok(())
    }

    fn catalog(&mut self) -> Result<Option<String>> {
        Ok(self.call(Call::Other("catalog"))?.catalog.clone())
    }

    fn warnings(&mut self) -> Result<Vec<Warning>> {
        Ok(self.call(Call::Other("warnings"))?.warnings.clone())
    }

    fn clear_warnings(&mut self) -> Result<()> {
        self.call(Call::ClearWarnings)?.warnings.clear();
        Ok(())
    }

    fn type_map(&mut self) -> Result<Option<TypeMap>> {
        let state = self.call(Call::Other("type_map"))?;
        if !state.type_map_supported {
            return Err(Error::unsupported("type map"));
        }
        Ok(state.type_map.clone())
    }

    fn set_type_map(&mut self, map: Option<TypeMap>) -> Result<()> {
        let mut state = self.call(Call::SetTypeMap(map.clone()))?;
        if !state.type_map_supported {
            return Err(Error::unsupported("type map"));
        }
        state.type_map = map;
        Ok(())
    }

    fn set_holdability(&mut self, holdability: Holdability) -> Result<()> {
        self.call(Call::SetHoldability(holdability))?.holdability = holdability;
        Ok(())
    }

    fn holdability(&mut self) -> Result<Holdability> {
        Ok(self.call(Call::Other("holdability"))?.holdability)
    }

    fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let mut state = self.call(Call::SetClientInfo(name.into(), value.map(str::to_string)))?;
        if !state.client_info_supported {
            return Err(Error::unsupported("client info"));
        }
        let info = state.client_info.get_or_insert_with(HashMap::new);
        match value {
            Some(value) => info.insert(name.to_string(), value.to_string()),
            None => info.remove(name),
        };
        Ok(())
    }

    fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()> {
        let mut state = self.call(Call::SetClientInfoAll(properties.clone()))?;
        if !state.client_info_supported {
            return Err(Error::unsupported("client info"));
        }
        state.client_info = properties;
        Ok(())
    }

    fn client_info(&mut self, name: &str) -> Result<Option<String>> {
        let state = self.call(Call::Other("client_info"))?;
        Ok(state.client_info.as_ref().and_then(|info| info.get(name).cloned()))
    }

    fn client_info_all(&mut self) -> Result<Option<ClientInfo>> {
        let state = self.call(Call::Other("client_info_all"))?;
        if !state.client_info_supported {
            return Err(Error::unsupported("client info"));
        }
        Ok(state.client_info.clone())
    }

    fn is_valid(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.call(Call::IsValid)?.valid)
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Close);
        state.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn schema(&mut self) -> Result<Option<String>> {
        Ok(self.call(Call::Other("schema"))?.schema.clone())
    }

    fn set_schema(&mut self, schema: Option<&str>) -> Result<()> {
        self.call(Call::Other("set_schema"))?.schema = schema.map(str::to_string);
        Ok(())
    }

    fn network_timeout(&mut self) -> Result<Duration> {
        self.call(Call::Other("network_timeout"))?
            .network_timeout
            .ok_or_else(|| Error::unsupported("network timeout"))
    }

    fn set_network_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.call(Call::Other("set_network_timeout"))?.network_timeout = Some(timeout);
        Ok(())
    }
}

/// A driver with no optional methods at all.
pub(crate) struct CoreOnlyConnection(FakeConnection);

impl CoreOnlyConnection {
    pub(crate) fn new() -> (Self, Arc<Mutex<FakeState>>) {
        let (fake, state) = FakeConnection::new();
        (Self(fake), state)
    }

    fn inner(&mut self) -> Result<&mut FakeConnection> {
        Ok(&mut self.0)
    }
}

impl Connection for CoreOnlyConnection {
    forward_connection_methods! { inner;
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
        fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()>;
        fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()>;
        fn client_info(&mut self, name: &str) -> Result<Option<String>>;
        fn client_info_all(&mut self) -> Result<Option<ClientInfo>>;
        fn is_valid(&mut self, timeout: Duration) -> Result<bool>;
        fn close(&mut self) -> Result<()>;
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

// ============================================================================
// Data source
// ============================================================================

/// Hands out [`FakeConnection`]s and keeps every state handle.
pub(crate) struct FakeDataSource {
    pub opened: Mutex<Vec<Arc<Mutex<FakeState>>>>,
    pub login_timeout: Mutex<Option<Duration>>,
    pub log_writer: Mutex<Option<LogWriter>>,
    pub reject_settings: bool,
    pub capabilities: Capabilities,
    /// Network timeout of every connection opened from now on.
    pub network_timeout: Option<Duration>,
}

impl FakeDataSource {
    pub(crate) fn new() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            login_timeout: Mutex::new(None),
            log_writer: Mutex::new(None),
            reject_settings: false,
            capabilities: Capabilities::EXTENDED,
            network_timeout: None,
        }
    }

    pub(crate) fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    fn check_settings(&self) -> Result<()> {
        if self.reject_settings {
            return Err(Error::Driver("settings are read-only".into()));
        }
        Ok(())
    }
}

impl DataSource for FakeDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        let (con, state) = FakeConnection::new();
        state.lock().network_timeout = self.network_timeout;
        self.opened.lock().push(state);
        Ok(Box::new(con))
    }

    fn log_writer(&self) -> Option<LogWriter> {
        self.log_writer.lock().clone()
    }

    fn set_log_writer(&self, writer: Option<LogWriter>) -> Result<()> {
        self.check_settings()?;
        *self.log_writer.lock() = writer;
        Ok(())
    }

    fn login_timeout(&self) -> Option<Duration> {
        *self.login_timeout.lock()
    }

    fn set_login_timeout(&self, timeout: Duration) -> Result<()> {
        self.check_settings()?;
        *self.login_timeout.lock() = Some(timeout);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn probe(&self, ty: TypeId) -> Option<&dyn Any> {
        if ty == TypeId::of::<Capabilities>() {
            return Some(&self.capabilities);
        }
        None
    }
}
