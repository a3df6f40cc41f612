//! 연결 관리 모듈
//!
//! 프로세스(또는 관리자)당 하나의 연결과 최대 하나의 추적 트랜잭션을 소유하는
//! 생명주기 관리자입니다. 연결은 처음 사용할 때 지연 생성됩니다.
//!
//! The manager is an explicit value owned by the caller and passed by reference;
//! nothing here is global. Its mutex makes each call atomic, not a sequence of calls:
//! two threads racing on `begin_transaction` still race on which transaction ends up
//! tracked. Serialize access to the manager if that matters.

use crate::config::{ConnectionStringSource, ManagerOptions, NestedBegin};
use crate::db::core::command::CommandBuilder;
use crate::db::core::executor::{Connector, Transport};
use crate::db::core::transaction::{Transaction, TransactionHandle};
use crate::error::{DalError, DalResult};
use crate::logging::ErrorSink;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// 연결 공유 핸들 - 동일성은 `Arc::ptr_eq` 또는 `id()`로 확인
pub type ConnectionHandle = Arc<Connection>;

/// 열린 데이터베이스 연결
pub struct Connection {
    id: u64,
    target: String,
    options: ManagerOptions,
    parallel_transactions: bool,
    /// `None` once closed
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl Connection {
    fn new(target: String, options: ManagerOptions, transport: Box<dyn Transport>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            target,
            options,
            parallel_transactions: transport.parallel_transactions(),
            transport: Mutex::new(Some(transport)),
        }
    }

    /// Whether a second transaction may begin while another is still active.
    pub fn parallel_transactions(&self) -> bool {
        self.parallel_transactions
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Masked `user@host:port/database` description.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.transport.lock().is_some()
    }

    /// 전송 계층에 대한 배타적 접근. 닫힌 연결이면 `InvalidState`.
    pub(crate) fn with_transport<R>(
        &self,
        action: &str,
        operation: impl FnOnce(&mut dyn Transport) -> DalResult<R>,
    ) -> DalResult<R> {
        let mut guard = self.transport.lock();
        match guard.as_mut() {
            Some(transport) => operation(transport.as_mut()),
            None => Err(DalError::InvalidState(format!(
                "cannot {}: connection {} is closed",
                action, self.id
            ))),
        }
    }

    /// Idempotent.
    pub(crate) fn close(&self) -> DalResult<()> {
        let transport = self.transport.lock().take();
        match transport {
            Some(mut transport) => {
                transport.close()?;
                info!(connection = self.id, db = %self.target, "Database connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.get_mut().take() {
            if let Err(e) = transport.close() {
                warn!(connection = self.id, error = %e, "Closing connection on drop failed");
            }
        }
    }
}

#[derive(Default)]
struct ManagerState {
    connection_key: Option<String>,
    connection: Option<ConnectionHandle>,
    transaction: Option<TransactionHandle>,
    disposed: bool,
}

/// 연결/트랜잭션 생명주기 관리자
pub struct ConnectionManager {
    source: Arc<dyn ConnectionStringSource>,
    connector: Arc<dyn Connector>,
    options: ManagerOptions,
    error_sink: Option<Arc<dyn ErrorSink>>,
    state: Mutex<ManagerState>,
}

impl ConnectionManager {
    /// 새 연결 관리자 생성 - 아직 아무것도 열지 않습니다.
    pub fn new(source: Arc<dyn ConnectionStringSource>, connector: Arc<dyn Connector>) -> Self {
        Self {
            source,
            connector,
            options: ManagerOptions::default(),
            error_sink: None,
            state: Mutex::new(ManagerState::default()),
        }
    }

    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Connection setup failures are recorded here before being returned.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// 사용할 연결 문자열 키를 기록합니다. 연결이 열린 뒤에는 바꿀 수 없습니다.
    pub fn configure(&self, connection_key: &str) -> DalResult<()> {
        let mut state = self.state.lock();
        Self::ensure_usable(&state, "configure")?;

        if state.connection.is_some() {
            return Err(DalError::InvalidState(format!(
                "cannot configure '{}': the connection is already open",
                connection_key
            )));
        }

        debug!(key = connection_key, "Connection string key configured");
        state.connection_key = Some(connection_key.to_string());
        Ok(())
    }

    pub fn connection_key(&self) -> Option<String> {
        self.state.lock().connection_key.clone()
    }

    /// 단일 연결 반환 - 첫 호출에서 엽니다.
    pub fn connection(&self) -> DalResult<ConnectionHandle> {
        let mut state = self.state.lock();
        self.ensure_connection(&mut state)
    }

    /// Eagerly opens the connection. Same handle as [`ConnectionManager::connection`].
    pub fn open(&self) -> DalResult<ConnectionHandle> {
        self.connection()
    }

    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .connection
            .as_ref()
            .is_some_and(|c| c.is_open())
    }

    /// 새 트랜잭션 시작 후 추적 대상으로 저장
    ///
    /// While the tracked transaction is active, [`NestedBegin::Replace`] starts a second
    /// one only on connections that run transactions in parallel. Otherwise, and always
    /// under [`NestedBegin::Reject`], this fails with `InvalidState` and the tracked
    /// transaction is left untouched.
    pub fn begin_transaction(&self) -> DalResult<TransactionHandle> {
        let mut state = self.state.lock();
        let connection = self.ensure_connection(&mut state)?;

        if let Some(previous) = state.transaction.as_ref().filter(|tx| tx.is_active()) {
            match self.options.nested_begin {
                NestedBegin::Reject => {
                    return Err(DalError::InvalidState(format!(
                        "transaction {} is still active",
                        previous.underlying_handle()
                    )));
                }
                NestedBegin::Replace if !connection.parallel_transactions() => {
                    return Err(DalError::InvalidState(format!(
                        "transaction {} is still active and connection {} runs one transaction at a time",
                        previous.underlying_handle(),
                        connection.id()
                    )));
                }
                NestedBegin::Replace => {
                    warn!(
                        transaction = previous.underlying_handle(),
                        "Active transaction is no longer tracked by the manager"
                    );
                }
            }
        }

        let transaction = Transaction::begin(&connection)?;
        state.transaction = Some(Arc::clone(&transaction));
        Ok(transaction)
    }

    /// 현재 추적 중인 트랜잭션
    pub fn current_transaction(&self) -> Option<TransactionHandle> {
        self.state.lock().transaction.clone()
    }

    /// 현재 연결과 현재 활성 트랜잭션을 지금 이 시점에 고정한 커맨드 빌더
    pub fn command(&self) -> DalResult<CommandBuilder> {
        let mut state = self.state.lock();
        let connection = self.ensure_connection(&mut state)?;
        let transaction = state.transaction.clone().filter(|tx| tx.is_active());
        Ok(CommandBuilder::new(connection, transaction))
    }

    /// 추적 트랜잭션을 먼저 폐기하고 연결을 닫습니다. 두 번째 호출은 아무것도 하지 않습니다.
    pub fn dispose(&self) -> DalResult<()> {
        let mut state = self.state.lock();
        if state.disposed {
            return Ok(());
        }
        state.disposed = true;

        let transaction_result = match state.transaction.take() {
            Some(transaction) => transaction.dispose(),
            None => Ok(()),
        };

        let connection_result = match state.connection.take() {
            Some(connection) => connection.close(),
            None => Ok(()),
        };

        debug!("Connection manager disposed");
        transaction_result.and(connection_result)
    }

    /// Alias of [`ConnectionManager::dispose`].
    pub fn close(&self) -> DalResult<()> {
        self.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn ensure_usable(state: &ManagerState, action: &str) -> DalResult<()> {
        if state.disposed {
            Err(DalError::InvalidState(format!(
                "cannot {}: connection manager is disposed",
                action
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_connection(&self, state: &mut ManagerState) -> DalResult<ConnectionHandle> {
        Self::ensure_usable(state, "use the connection")?;

        if let Some(connection) = &state.connection {
            return Ok(Arc::clone(connection));
        }

        let connection = self
            .open_connection(state.connection_key.as_deref())
            .map_err(|e| self.report_setup_failure(e))?;
        state.connection = Some(Arc::clone(&connection));
        Ok(connection)
    }

    fn open_connection(&self, key: Option<&str>) -> DalResult<ConnectionHandle> {
        let key = key.ok_or_else(|| {
            DalError::Configuration("no connection string key configured".to_string())
        })?;

        let descriptor = self.source.resolve(key).ok_or_else(|| {
            DalError::Configuration(format!("connection string '{}' not found", key))
        })?;

        info!(key, db = %descriptor, "데이터베이스 연결 시도");
        let transport = self.connector.connect(&descriptor)?;

        let connection = Arc::new(Connection::new(
            descriptor.to_string(),
            self.options.clone(),
            transport,
        ));
        info!(connection = connection.id(), "데이터베이스 연결 완료");
        Ok(connection)
    }

    fn report_setup_failure(&self, error: DalError) -> DalError {
        error.log("connection setup");
        if let Some(sink) = &self.error_sink {
            sink.record(&error);
        }
        error
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!(error = %e, "Disposing connection manager on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionDescriptor, MemoryConnectionStrings};
    use crate::db::memory::MemoryConnector;

    fn manager(connector: &MemoryConnector) -> ConnectionManager {
        let source = MemoryConnectionStrings::new()
            .with("shopping", ConnectionDescriptor::new("localhost", "shopping"));
        ConnectionManager::new(Arc::new(source), Arc::new(connector.clone()))
    }

    #[test]
    fn test_lazy_open_and_identity() {
        let connector = MemoryConnector::new();
        let manager = manager(&connector);
        manager.configure("shopping").unwrap();
        assert!(!manager.is_open());
        assert_eq!(connector.connect_count(), 0);

        let first = manager.connection().unwrap();
        let second = manager.connection().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(), 1);
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let connector = MemoryConnector::new();
        let manager = manager(&connector);
        assert!(matches!(manager.connection(), Err(DalError::Configuration(_))));

        manager.configure("billing").unwrap();
        assert!(matches!(manager.connection(), Err(DalError::Configuration(_))));
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn test_configure_after_open_fails() {
        let connector = MemoryConnector::new();
        let manager = manager(&connector);
        manager.configure("shopping").unwrap();
        manager.open().unwrap();
        assert!(matches!(manager.configure("other"), Err(DalError::InvalidState(_))));
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let connector = MemoryConnector::new();
        let manager = manager(&connector);
        manager.configure("shopping").unwrap();
        let connection = manager.connection().unwrap();

        manager.dispose().unwrap();
        manager.dispose().unwrap();
        assert!(!connection.is_open());
        assert!(manager.is_disposed());
        assert!(matches!(manager.connection(), Err(DalError::InvalidState(_))));
        assert!(matches!(manager.begin_transaction(), Err(DalError::InvalidState(_))));
        assert_eq!(connector.close_count(), 1);
    }

    #[test]
    fn test_dispose_without_open_touches_nothing() {
        let connector = MemoryConnector::new();
        let manager = manager(&connector);
        manager.dispose().unwrap();
        assert_eq!(connector.connect_count(), 0);
        assert_eq!(connector.close_count(), 0);
    }
}
