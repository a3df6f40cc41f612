//! MariaDB/MySQL 실행기
//!
//! One physical `sqlx` connection per transport. The public API is blocking: every call
//! drives a private current-thread tokio runtime until the server answers. Do not call
//! it from inside an async task; use `tokio::task::spawn_blocking` there.
//!
//! A single connection carries one server-side transaction at a time. The server would
//! commit the pending transaction on a second `START TRANSACTION` and would enlist any
//! statement sent meanwhile, so both are refused with `InvalidState` while one is pending.

use crate::config::ConnectionDescriptor;
use crate::db::core::executor::{positional, Connector, Statement, Transport};
use crate::db::core::types::{DbValue, Row, TransactionId};
use crate::error::{connectivity_from_sqlx, DalError, DalResult};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, Executor as _, MySql, Row as _, TypeInfo};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info};

/// MariaDB 커넥터
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl MySqlConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for MySqlConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> DalResult<Box<dyn Transport>> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DalError::connectivity_with("Failed to start I/O runtime", e))?;

        let options = MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .password(&descriptor.password)
            .database(&descriptor.database);

        let timeout = self.connect_timeout;
        let connection = runtime
            .block_on(async {
                tokio::time::timeout(timeout, MySqlConnection::connect_with(&options)).await
            })
            .map_err(|_| {
                error!(db = %descriptor, "Connection attempt timed out after {:?}", timeout);
                DalError::connectivity(format!("{}: connection timed out after {:?}", descriptor, timeout))
            })?
            .map_err(|e| {
                error!(db = %descriptor, error = %e, "데이터베이스 연결 실패");
                connectivity_from_sqlx(e, &descriptor.to_string())
            })?;

        info!(db = %descriptor, "MariaDB 연결 생성 완료");

        Ok(Box::new(MySqlTransport {
            runtime,
            connection: Some(connection),
            current: None,
            next_transaction: 0,
        }))
    }
}

/// MariaDB 전송 계층
pub struct MySqlTransport {
    runtime: Runtime,
    connection: Option<MySqlConnection>,
    current: Option<TransactionId>,
    next_transaction: TransactionId,
}

impl MySqlTransport {
    fn connection(&mut self) -> DalResult<(&Runtime, &mut MySqlConnection)> {
        match self.connection.as_mut() {
            Some(connection) => Ok((&self.runtime, connection)),
            None => Err(DalError::InvalidState("MySQL connection is closed".to_string())),
        }
    }

    /// 트랜잭션 제어 문장은 텍스트 프로토콜로 보냅니다.
    fn control(&mut self, sql: &'static str) -> DalResult<()> {
        let (runtime, connection) = self.connection()?;
        runtime.block_on(connection.execute(sql))?;
        debug!("{}", sql);
        Ok(())
    }

    fn finish(&mut self, transaction: TransactionId, sql: &'static str) -> DalResult<()> {
        if self.current != Some(transaction) {
            return Err(DalError::InvalidState(format!(
                "transaction {} is not the current transaction on this connection",
                transaction
            )));
        }
        self.control(sql)?;
        self.current = None;
        Ok(())
    }

    fn check_enlistment(&self, statement: &Statement<'_>) -> DalResult<()> {
        match (statement.transaction, self.current) {
            (Some(id), current) if current != Some(id) => Err(DalError::InvalidState(format!(
                "transaction {} is not the current transaction on this connection",
                id
            ))),
            (None, Some(pending)) => Err(DalError::InvalidState(format!(
                "transaction {} is pending on this connection and the command is not enlisted in it",
                pending
            ))),
            _ => Ok(()),
        }
    }
}

impl Transport for MySqlTransport {
    fn begin(&mut self) -> DalResult<TransactionId> {
        if let Some(pending) = self.current {
            return Err(DalError::InvalidState(format!(
                "transaction {} is still pending on this connection",
                pending
            )));
        }
        self.control("START TRANSACTION")?;
        self.next_transaction += 1;
        self.current = Some(self.next_transaction);
        Ok(self.next_transaction)
    }

    fn commit(&mut self, transaction: TransactionId) -> DalResult<()> {
        self.finish(transaction, "COMMIT")
    }

    fn rollback(&mut self, transaction: TransactionId) -> DalResult<()> {
        self.finish(transaction, "ROLLBACK")
    }

    fn query(&mut self, statement: &Statement<'_>) -> DalResult<Vec<Row>> {
        self.check_enlistment(statement)?;
        let (sql, values) = positional(statement.text, statement.parameters)?;
        let (runtime, connection) = self.connection()?;

        let rows = runtime.block_on(bind_values(sqlx::query(&sql), &values).fetch_all(connection))?;
        rows.iter().map(row_to_values).collect()
    }

    fn execute(&mut self, statement: &Statement<'_>) -> DalResult<u64> {
        self.check_enlistment(statement)?;
        let (sql, values) = positional(statement.text, statement.parameters)?;
        let (runtime, connection) = self.connection()?;

        let result = runtime.block_on(bind_values(sqlx::query(&sql), &values).execute(connection))?;
        Ok(result.rows_affected())
    }

    fn close(&mut self) -> DalResult<()> {
        if let Some(connection) = self.connection.take() {
            self.current = None;
            self.runtime.block_on(connection.close())?;
            info!("MariaDB 연결 종료 완료");
        }
        Ok(())
    }
}

/// Build parameterized query
fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &[&DbValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            DbValue::String(s) => query.bind(s.clone()),
            DbValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    query.bind(n.to_string())
                }
            }
            DbValue::Bool(b) => query.bind(*b),
            DbValue::Null => query.bind(Option::<String>::None),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Convert database row to [`Row`]
fn row_to_values(row: &MySqlRow) -> DalResult<Row> {
    let mut result = Row::new();

    for column in row.columns() {
        let name = column.name();

        let value = match column.type_info().name() {
            "BOOLEAN" | "BOOL" => row
                .try_get::<Option<bool>, _>(name)?
                .map(DbValue::Bool)
                .unwrap_or(DbValue::Null),
            "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" => row
                .try_get::<Option<i64>, _>(name)?
                .map(DbValue::from)
                .unwrap_or(DbValue::Null),
            "INT UNSIGNED" | "BIGINT UNSIGNED" | "SMALLINT UNSIGNED" | "TINYINT UNSIGNED"
            | "MEDIUMINT UNSIGNED" => row
                .try_get::<Option<u64>, _>(name)?
                .map(DbValue::from)
                .unwrap_or(DbValue::Null),
            "FLOAT" | "DOUBLE" => row
                .try_get::<Option<f64>, _>(name)?
                .and_then(serde_json::Number::from_f64)
                .map(DbValue::Number)
                .unwrap_or(DbValue::Null),
            // Sent as exact text; kept as text only when f64 cannot hold it.
            "DECIMAL" | "NUMERIC" => row
                .try_get_unchecked::<Option<String>, _>(name)?
                .map(decimal_value)
                .unwrap_or(DbValue::Null),
            "DATETIME" | "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)?
                .map(|v| DbValue::String(v.to_string()))
                .unwrap_or(DbValue::Null),
            "DATE" => row
                .try_get::<Option<chrono::NaiveDate>, _>(name)?
                .map(|v| DbValue::String(v.to_string()))
                .unwrap_or(DbValue::Null),
            _ => row
                .try_get_unchecked::<Option<String>, _>(name)?
                .map(DbValue::String)
                .unwrap_or(DbValue::Null),
        };

        result.insert(name, value);
    }

    Ok(result)
}

fn decimal_value(text: String) -> DbValue {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(DbValue::Number)
        .unwrap_or(DbValue::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_transport() -> MySqlTransport {
        MySqlTransport {
            runtime: Builder::new_current_thread().enable_all().build().unwrap(),
            connection: None,
            current: Some(1),
            next_transaction: 1,
        }
    }

    #[test]
    fn test_second_begin_is_refused_without_touching_the_server() {
        let mut transport = pending_transport();
        assert!(matches!(transport.begin(), Err(DalError::InvalidState(msg)) if msg.contains('1')));
        assert_eq!(transport.current, Some(1));
    }

    #[test]
    fn test_unenlisted_statement_refused_while_transaction_pending() {
        let mut transport = pending_transport();
        let stray = Statement {
            text: "DELETE FROM account",
            parameters: &[],
            transaction: None,
        };
        assert!(matches!(transport.execute(&stray), Err(DalError::InvalidState(msg)) if msg.contains("not enlisted")));

        let foreign = Statement {
            transaction: Some(7),
            ..stray
        };
        assert!(matches!(transport.query(&foreign), Err(DalError::InvalidState(_))));
    }

    #[test]
    fn test_decimal_text_becomes_number() {
        assert_eq!(decimal_value("49.50".to_string()), json!(49.5));
        assert_eq!(decimal_value("-3".to_string()), json!(-3.0));
        assert_eq!(decimal_value("n/a".to_string()), json!("n/a"));
    }
}
