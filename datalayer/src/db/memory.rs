//! 메모리 내 실행기 (테스트/데모용)
//!
//! Records every statement and transaction event, and answers from a FIFO of scripted
//! results. Clones of a [`MemoryConnector`] share the same script and recordings, so a
//! test keeps one clone to inspect what the code under test executed.
//!
//! Each transport behaves like one database session: a single transaction at a time,
//! and no unenlisted statement while it is pending. [`MemoryConnector::with_parallel_transactions`]
//! lifts both limits for code that needs several live transactions on one connection.

use crate::config::ConnectionDescriptor;
use crate::db::core::executor::{Connector, Statement, Transport};
use crate::db::core::types::{DbValue, Parameter, Row, TransactionId};
use crate::error::{DalError, DalResult};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Provider-style failure raised by a scripted result.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MemoryProviderError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Execute,
}

/// 실행된 문장 기록
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub kind: StatementKind,
    pub text: String,
    pub parameters: Vec<Parameter>,
    pub transaction: Option<TransactionId>,
}

impl RecordedStatement {
    pub fn parameter(&self, name: &str) -> Option<&DbValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin(TransactionId),
    Commit(TransactionId),
    Rollback(TransactionId),
}

#[derive(Debug, Clone)]
enum ScriptedResult {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    scripted: VecDeque<ScriptedResult>,
    statements: Vec<RecordedStatement>,
    events: Vec<TransactionEvent>,
    active: HashSet<TransactionId>,
    next_transaction: TransactionId,
    connects: usize,
    closes: usize,
    fail_connect: Option<String>,
    parallel: bool,
}

/// 메모리 내 커넥터
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transports opened from now on allow several active transactions at once.
    pub fn with_parallel_transactions(self) -> Self {
        self.state.lock().parallel = true;
        self
    }

    /// Next query returns these rows.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().scripted.push_back(ScriptedResult::Rows(rows));
    }

    /// Next non-query reports this affected-row count.
    pub fn push_affected(&self, affected: u64) {
        self.state
            .lock()
            .scripted
            .push_back(ScriptedResult::Affected(affected));
    }

    /// Next statement fails with a provider error.
    pub fn push_failure(&self, message: &str) {
        self.state
            .lock()
            .scripted
            .push_back(ScriptedResult::Fail(message.to_string()));
    }

    /// Next connect attempt fails with a connectivity error.
    pub fn fail_next_connect(&self, message: &str) {
        self.state.lock().fail_connect = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.lock().statements.clone()
    }

    pub fn events(&self) -> Vec<TransactionEvent> {
        self.state.lock().events.clone()
    }

    pub fn active_transactions(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> DalResult<Box<dyn Transport>> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_connect.take() {
            return Err(DalError::connectivity(format!("{}: {}", descriptor, message)));
        }
        state.connects += 1;
        debug!(db = %descriptor, "Memory transport opened");

        Ok(Box::new(MemoryTransport {
            state: Arc::clone(&self.state),
            parallel: state.parallel,
            pending: HashSet::new(),
        }))
    }
}

/// 메모리 내 전송 계층
#[derive(Debug)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
    parallel: bool,
    /// Transactions begun on this transport and not yet finished
    pending: HashSet<TransactionId>,
}

impl MemoryTransport {
    fn check_enlistment(&self, statement: &Statement<'_>) -> DalResult<()> {
        match statement.transaction {
            Some(id) if !self.pending.contains(&id) => Err(DalError::InvalidState(format!(
                "transaction {} is not active on this connection",
                id
            ))),
            None if !self.parallel && !self.pending.is_empty() => Err(DalError::InvalidState(format!(
                "transaction {} is pending on this connection and the command is not enlisted in it",
                describe(&self.pending)
            ))),
            _ => Ok(()),
        }
    }

    fn record(&self, kind: StatementKind, statement: &Statement<'_>) -> DalResult<Option<ScriptedResult>> {
        self.check_enlistment(statement)?;
        let mut state = self.state.lock();

        state.statements.push(RecordedStatement {
            kind,
            text: statement.text.to_string(),
            parameters: statement.parameters.to_vec(),
            transaction: statement.transaction,
        });
        Ok(state.scripted.pop_front())
    }

    fn finish(&mut self, id: TransactionId, event: TransactionEvent) -> DalResult<()> {
        if !self.pending.remove(&id) {
            return Err(DalError::InvalidState(format!(
                "transaction {} is not active on this connection",
                id
            )));
        }
        let mut state = self.state.lock();
        state.active.remove(&id);
        state.events.push(event);
        Ok(())
    }
}

fn describe(ids: &HashSet<TransactionId>) -> String {
    let mut ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    ids.sort();
    ids.join(", ")
}

impl Transport for MemoryTransport {
    fn begin(&mut self) -> DalResult<TransactionId> {
        if !self.parallel && !self.pending.is_empty() {
            return Err(DalError::InvalidState(format!(
                "transaction {} is still pending on this connection",
                describe(&self.pending)
            )));
        }
        let mut state = self.state.lock();
        state.next_transaction += 1;
        let id = state.next_transaction;
        state.active.insert(id);
        state.events.push(TransactionEvent::Begin(id));
        self.pending.insert(id);
        Ok(id)
    }

    fn commit(&mut self, transaction: TransactionId) -> DalResult<()> {
        self.finish(transaction, TransactionEvent::Commit(transaction))
    }

    fn rollback(&mut self, transaction: TransactionId) -> DalResult<()> {
        self.finish(transaction, TransactionEvent::Rollback(transaction))
    }

    fn query(&mut self, statement: &Statement<'_>) -> DalResult<Vec<Row>> {
        match self.record(StatementKind::Query, statement)? {
            Some(ScriptedResult::Rows(rows)) => Ok(rows),
            Some(ScriptedResult::Fail(message)) => Err(DalError::provider(MemoryProviderError(message))),
            Some(ScriptedResult::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    fn execute(&mut self, statement: &Statement<'_>) -> DalResult<u64> {
        match self.record(StatementKind::Execute, statement)? {
            Some(ScriptedResult::Affected(affected)) => Ok(affected),
            Some(ScriptedResult::Rows(rows)) => Ok(rows.len() as u64),
            Some(ScriptedResult::Fail(message)) => Err(DalError::provider(MemoryProviderError(message))),
            None => Ok(0),
        }
    }

    fn close(&mut self) -> DalResult<()> {
        let mut state = self.state.lock();
        state.closes += 1;
        // 닫힌 연결의 미완료 트랜잭션은 서버가 롤백합니다.
        for id in self.pending.drain() {
            state.active.remove(&id);
        }
        Ok(())
    }

    fn parallel_transactions(&self) -> bool {
        self.parallel
    }
}
