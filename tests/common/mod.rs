//! Fake drivers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use interchangedb_pool::datasource::{
    DatabaseMetadata, IsolationLevel, Savepoint, Statement, StatementOptions, Warning,
};
use interchangedb_pool::{
    ClientInfo, Connection, DataSource, Error, Holdability, LogWriter, Result, TypeMap,
};
use parking_lot::Mutex;

// ============================================================================
// Connection
// ============================================================================

/// Session state of one [`StubConnection`], inspectable from the test.
#[derive(Debug, Clone, PartialEq)]
pub struct StubState {
    pub auto_commit: bool,
    pub holdability: Holdability,
    pub type_map: Option<TypeMap>,
    pub client_info: Option<ClientInfo>,
    pub warnings: Vec<Warning>,
    pub commits: usize,
    pub rollbacks: usize,
    pub closed: bool,
}

impl StubState {
    pub fn fresh(type_map: Option<TypeMap>) -> Self {
        Self {
            auto_commit: true,
            holdability: Holdability::HoldCursorsOverCommit,
            type_map,
            client_info: None,
            warnings: Vec::new(),
            commits: 0,
            rollbacks: 0,
            closed: false,
        }
    }
}

pub struct StubConnection {
    state: Arc<Mutex<StubState>>,
}

struct StubStatement;

impl Statement for StubStatement {
    fn execute(&mut self, _sql: Option<&str>) -> Result<u64> {
        Ok(0)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Connection for StubConnection {
    fn create_statement(&mut self, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        Ok(Box::new(StubStatement))
    }

    fn prepare_statement(&mut self, _sql: &str, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        Ok(Box::new(StubStatement))
    }

    fn prepare_call(&mut self, _sql: &str, _options: StatementOptions) -> Result<Box<dyn Statement>> {
        Ok(Box::new(StubStatement))
    }

    fn native_sql(&mut self, sql: &str) -> Result<String> {
        Ok(sql.to_string())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        self.state.lock().auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<bool> {
        Ok(self.state.lock().auto_commit)
    }

    fn commit(&mut self) -> Result<()> {
        self.state.lock().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.state.lock().rollbacks += 1;
        Ok(())
    }

    fn set_savepoint(&mut self, name: Option<&str>) -> Result<Savepoint> {
        Ok(name.map_or_else(|| Savepoint::unnamed(1), Savepoint::named))
    }

    fn rollback_to(&mut self, _savepoint: &Savepoint) -> Result<()> {
        Ok(())
    }

    fn release_savepoint(&mut self, _savepoint: &Savepoint) -> Result<()> {
        Ok(())
    }

    fn set_transaction_isolation(&mut self, _level: IsolationLevel) -> Result<()> {
        Ok(())
    }

    fn transaction_isolation(&mut self) -> Result<IsolationLevel> {
        Ok(IsolationLevel::ReadCommitted)
    }

    fn metadata(&mut self) -> Result<DatabaseMetadata> {
        Ok(DatabaseMetadata {
            product_name: "StubDB".into(),
            product_version: "0.1".into(),
            result_set_holdability: Holdability::HoldCursorsOverCommit,
        })
    }

    fn set_read_only(&mut self, _read_only: bool) -> Result<()> {
        Ok(())
    }

    fn is_read_only(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn set_catalog(&mut self, _catalog: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn catalog(&mut self) -> Result<Option<String>> {
        Ok(None)
    }

    fn warnings(&mut self) -> Result<Vec<Warning>> {
        Ok(self.state.lock().warnings.clone())
    }

    fn clear_warnings(&mut self) -> Result<()> {
        self.state.lock().warnings.clear();
        Ok(())
    }

    fn type_map(&mut self) -> Result<Option<TypeMap>> {
        Ok(self.state.lock().type_map.clone())
    }

    fn set_type_map(&mut self, map: Option<TypeMap>) -> Result<()> {
        self.state.lock().type_map = map;
        Ok(())
    }

    fn set_holdability(&mut self, holdability: Holdability) -> Result<()> {
        self.state.lock().holdability = holdability;
        Ok(())
    }

    fn holdability(&mut self) -> Result<Holdability> {
        Ok(self.state.lock().holdability)
    }

    fn set_client_info(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();
        let info = state.client_info.get_or_insert_with(ClientInfo::new);
        match value {
            Some(value) => info.insert(name.to_string(), value.to_string()),
            None => info.remove(name),
        };
        Ok(())
    }

    fn set_client_info_all(&mut self, properties: Option<ClientInfo>) -> Result<()> {
        self.state.lock().client_info = properties;
        Ok(())
    }

    fn client_info(&mut self, name: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        Ok(state.client_info.as_ref().and_then(|info| info.get(name).cloned()))
    }

    fn client_info_all(&mut self) -> Result<Option<ClientInfo>> {
        Ok(self.state.lock().client_info.clone())
    }

    fn is_valid(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.state.lock().closed)
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

// ============================================================================
// Data sources
// ============================================================================

/// Opens [`StubConnection`]s and keeps a handle on each one's state.
pub struct StubDataSource {
    pub opened: Mutex<Vec<Arc<Mutex<StubState>>>>,
    pub initial_type_map: Option<TypeMap>,
    pub login_timeout: Mutex<Option<Duration>>,
    pub log_writer: Mutex<Option<LogWriter>>,
}

impl StubDataSource {
    pub fn new() -> Self {
        Self::with_type_map(None)
    }

    pub fn with_type_map(initial_type_map: Option<TypeMap>) -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            initial_type_map,
            login_timeout: Mutex::new(None),
            log_writer: Mutex::new(None),
        }
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// State of the `index`th connection opened.
    pub fn state(&self, index: usize) -> StubState {
        self.opened.lock()[index].lock().clone()
    }
}

impl DataSource for StubDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        let state = Arc::new(Mutex::new(StubState::fresh(self.initial_type_map.clone())));
        self.opened.lock().push(Arc::clone(&state));
        Ok(Box::new(StubConnection { state }))
    }

    fn log_writer(&self) -> Option<LogWriter> {
        self.log_writer.lock().clone()
    }

    fn set_log_writer(&self, writer: Option<LogWriter>) -> Result<()> {
        *self.log_writer.lock() = writer;
        Ok(())
    }

    fn login_timeout(&self) -> Option<Duration> {
        *self.login_timeout.lock()
    }

    fn set_login_timeout(&self, timeout: Duration) -> Result<()> {
        *self.login_timeout.lock() = Some(timeout);
        Ok(())
    }
}

/// A data source whose `get_connection` never returns.
pub struct BlockingDataSource;

impl DataSource for BlockingDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        loop {
            thread::park();
        }
    }

    fn log_writer(&self) -> Option<LogWriter> {
        None
    }

    fn set_log_writer(&self, _writer: Option<LogWriter>) -> Result<()> {
        Ok(())
    }

    fn login_timeout(&self) -> Option<Duration> {
        None
    }

    fn set_login_timeout(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// A data source whose `get_connection` always fails with "Boom!".
pub struct FailingDataSource;

impl DataSource for FailingDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        Err(Error::Driver("Boom!".into()))
    }

    fn log_writer(&self) -> Option<LogWriter> {
        None
    }

    fn set_log_writer(&self, _writer: Option<LogWriter>) -> Result<()> {
        Ok(())
    }

    fn login_timeout(&self) -> Option<Duration> {
        None
    }

    fn set_login_timeout(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

pub fn type_map(pairs: &[(&str, &str)]) -> TypeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
