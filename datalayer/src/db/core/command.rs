//! 커맨드 빌더 모듈
//!
//! A builder snapshots the connection and the transaction it is given at construction
//! time. The transaction is never re-resolved afterwards, so a builder created before
//! `begin_transaction` yields commands that are not enlisted in that transaction, and
//! the connection refuses them with `InvalidState` until that transaction finishes.
//! Build a fresh builder per command.

use crate::db::core::connection::ConnectionHandle;
use crate::db::core::executor::{placeholders, Statement, Transport};
use crate::db::core::transaction::TransactionHandle;
use crate::db::core::types::{DbValue, Parameter, Row, TransactionId};
use crate::error::{DalError, DalResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 파라미터화된 커맨드 빌더
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    connection: ConnectionHandle,
    transaction: Option<TransactionHandle>,
    text: String,
    parameters: Vec<Parameter>,
}

impl CommandBuilder {
    /// 명시적인 연결과 (선택적) 트랜잭션에 바인딩된 빌더 생성
    pub fn new(connection: ConnectionHandle, transaction: Option<TransactionHandle>) -> Self {
        Self {
            connection,
            transaction,
            text: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Replaces any previously set text.
    pub fn with_command_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// 이름이 있는 파라미터 추가
    ///
    /// `None` is bound as the database null marker, it is not omitted. A repeated
    /// name overwrites the earlier value in place.
    pub fn add_parameter(mut self, name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        let parameter = Parameter::new(name, value);
        match self.parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => existing.value = parameter.value,
            None => self.parameters.push(parameter),
        }
        self
    }

    pub fn add_null(self, name: impl Into<String>) -> Self {
        self.add_parameter(name, DbValue::Null)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn transaction(&self) -> Option<&TransactionHandle> {
        self.transaction.as_ref()
    }

    /// 실행 가능한 커맨드를 만듭니다. 아무것도 실행하지 않습니다.
    pub fn build(&self) -> DalResult<Command> {
        if self.text.trim().is_empty() {
            return Err(DalError::Build("command text is empty".to_string()));
        }

        if !self.connection.is_open() {
            return Err(DalError::InvalidState(format!(
                "cannot build a command: connection {} is closed",
                self.connection.id()
            )));
        }

        if let Some(transaction) = &self.transaction {
            if !Arc::ptr_eq(transaction.connection(), &self.connection) {
                return Err(DalError::Build(format!(
                    "transaction {} belongs to another connection",
                    transaction.underlying_handle()
                )));
            }
        }

        for name in placeholders(&self.text) {
            if !self.parameters.iter().any(|p| p.name == name) {
                return Err(DalError::Build(format!("parameter '{}' is not bound", name)));
            }
        }

        Ok(Command {
            connection: Arc::clone(&self.connection),
            transaction: self.transaction.clone(),
            text: self.text.clone(),
            parameters: self.parameters.clone(),
        })
    }
}

/// 실행 가능한 커맨드 - 텍스트와 바인딩은 빌드 후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct Command {
    connection: ConnectionHandle,
    transaction: Option<TransactionHandle>,
    text: String,
    parameters: Vec<Parameter>,
}

impl Command {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn transaction(&self) -> Option<&TransactionHandle> {
        self.transaction.as_ref()
    }

    pub fn is_enlisted(&self) -> bool {
        self.transaction.is_some()
    }

    /// 행을 반환하는 쿼리 실행
    pub fn execute_query(&self) -> DalResult<Vec<Row>> {
        let rows = self.run("query", |transport, statement| transport.query(statement))?;
        debug!(rows = rows.len(), "Query returned rows");
        Ok(rows)
    }

    /// INSERT/UPDATE/DELETE 실행 - 영향받은 행 수 반환
    pub fn execute_non_query(&self) -> DalResult<u64> {
        self.run("execute", |transport, statement| transport.execute(statement))
    }

    /// First column of the first row, `None` when no row matched.
    pub fn execute_scalar(&self) -> DalResult<Option<DbValue>> {
        let rows = self.execute_query()?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.first_value().cloned()))
    }

    fn run<R>(
        &self,
        action: &str,
        operation: impl FnOnce(&mut dyn Transport, &Statement<'_>) -> DalResult<R>,
    ) -> DalResult<R> {
        let options = self.connection.options();
        if options.log_commands {
            debug!(
                connection = self.connection.id(),
                enlisted = self.is_enlisted(),
                "Executing command: {} | Params: {:?}",
                self.text,
                self.parameters
            );
        }

        let start = Instant::now();
        let result = match &self.transaction {
            Some(transaction) => transaction.with_active(action, |id| {
                self.dispatch(action, Some(id), operation)
            }),
            None => self.dispatch(action, None, operation),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > options.slow_command_threshold_ms {
            warn!(
                "Slow command detected ({} ms): {}",
                elapsed_ms,
                self.text.chars().take(200).collect::<String>()
            );
        }

        result
    }

    fn dispatch<R>(
        &self,
        action: &str,
        transaction: Option<TransactionId>,
        operation: impl FnOnce(&mut dyn Transport, &Statement<'_>) -> DalResult<R>,
    ) -> DalResult<R> {
        let statement = Statement {
            text: &self.text,
            parameters: &self.parameters,
            transaction,
        };
        self.connection
            .with_transport(action, |transport| operation(transport, &statement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionDescriptor, MemoryConnectionStrings};
    use crate::db::core::connection::ConnectionManager;
    use crate::db::memory::MemoryConnector;
    use serde_json::json;

    fn open_manager() -> (ConnectionManager, MemoryConnector) {
        let connector = MemoryConnector::new();
        let source = MemoryConnectionStrings::new()
            .with("shopping", ConnectionDescriptor::new("localhost", "shopping"));
        let manager = ConnectionManager::new(Arc::new(source), Arc::new(connector.clone()));
        manager.configure("shopping").unwrap();
        (manager, connector)
    }

    #[test]
    fn test_build_requires_text() {
        let (manager, _) = open_manager();
        let err = manager.command().unwrap().build().unwrap_err();
        assert!(matches!(err, DalError::Build(_)));

        let err = manager
            .command()
            .unwrap()
            .with_command_text("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, DalError::Build(_)));
    }

    #[test]
    fn test_text_overwrites_and_duplicate_parameter_last_wins() {
        let (manager, _) = open_manager();
        let command = manager
            .command()
            .unwrap()
            .with_command_text("SELECT 1")
            .with_command_text("SELECT * FROM account WHERE email = @email")
            .add_parameter("@email", "first@example.com")
            .add_parameter("@email", "second@example.com")
            .build()
            .unwrap();

        assert_eq!(command.text(), "SELECT * FROM account WHERE email = @email");
        assert_eq!(command.parameters().len(), 1);
        assert_eq!(command.parameters()[0].value, json!("second@example.com"));
    }

    #[test]
    fn test_null_parameter_differs_from_omitted() {
        let (manager, connector) = open_manager();
        let text = "UPDATE account SET nick = @x WHERE email = @email";

        let omitted = manager
            .command()
            .unwrap()
            .with_command_text(text)
            .add_parameter("@email", "a@example.com")
            .build()
            .unwrap_err();
        assert!(matches!(omitted, DalError::Build(msg) if msg.contains("@x")));

        let command = manager
            .command()
            .unwrap()
            .with_command_text(text)
            .add_parameter("@email", "a@example.com")
            .add_parameter("@x", None::<String>)
            .build()
            .unwrap();
        command.execute_non_query().unwrap();

        let recorded = connector.statements();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].parameter("@x"), Some(&DbValue::Null));
    }

    #[test]
    fn test_build_on_closed_connection_fails() {
        let (manager, _) = open_manager();
        let builder = manager.command().unwrap().with_command_text("SELECT 1");
        manager.dispose().unwrap();
        assert!(matches!(builder.build(), Err(DalError::InvalidState(_))));
    }

    #[test]
    fn test_build_does_not_execute() {
        let (manager, connector) = open_manager();
        manager
            .command()
            .unwrap()
            .with_command_text("DELETE FROM account")
            .build()
            .unwrap();
        assert!(connector.statements().is_empty());
    }

    #[test]
    fn test_execute_scalar() {
        let (manager, connector) = open_manager();
        connector.push_rows(vec![Row::new().with("count", 3)]);
        let command = manager
            .command()
            .unwrap()
            .with_command_text("SELECT COUNT(*) AS count FROM account")
            .build()
            .unwrap();
        assert_eq!(command.execute_scalar().unwrap(), Some(json!(3)));
        assert_eq!(command.execute_scalar().unwrap(), None);
    }
}
