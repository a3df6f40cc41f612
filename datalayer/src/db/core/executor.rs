//! 커맨드 실행기 인터페이스
//!
//! 드라이버(전송 계층)를 감추는 실행기 경계입니다. 코어는 전송 계층을 "트랜잭션에
//! 참여할 수 있는, 파라미터화된 문장 실행기"로만 다룹니다.

use crate::config::ConnectionDescriptor;
use crate::db::core::types::{DbValue, Parameter, Row, TransactionId};
use crate::error::{DalError, DalResult};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Quoted literals, quoted identifiers and `@@system` variables are matched
    /// before `@name`, so an `@` inside them never reads as a placeholder.
    /// MySQL escapes quotes either by doubling them or with a backslash.
    static ref PLACEHOLDER: Regex = Regex::new(
        r#"'(?:[^'\\]|\\.|'')*'|"(?:[^"\\]|\\.|"")*"|`[^`]*`|@@[A-Za-z0-9_.$]*|@[A-Za-z_][A-Za-z0-9_]*"#
    )
    .expect("valid placeholder regex");
}

fn is_placeholder(token: &str) -> bool {
    token.starts_with('@') && !token.starts_with("@@")
}

/// Opens transports for a resolved connection descriptor.
pub trait Connector: Send + Sync {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> DalResult<Box<dyn Transport>>;
}

/// 단일 물리 연결 위의 실행기 핸들
///
/// Every call blocks the calling thread until the database responds.
pub trait Transport: Send {
    fn begin(&mut self) -> DalResult<TransactionId>;

    fn commit(&mut self, transaction: TransactionId) -> DalResult<()>;

    fn rollback(&mut self, transaction: TransactionId) -> DalResult<()>;

    /// Runs a statement that returns rows.
    fn query(&mut self, statement: &Statement<'_>) -> DalResult<Vec<Row>>;

    /// Runs a statement and returns the affected-row count.
    fn execute(&mut self, statement: &Statement<'_>) -> DalResult<u64>;

    fn close(&mut self) -> DalResult<()>;

    /// Whether `begin` may be called again before the current transaction finishes.
    /// A single database session cannot, so this is `false` unless a transport says otherwise.
    fn parallel_transactions(&self) -> bool {
        false
    }
}

/// 실행 요청 - 텍스트, 파라미터, 참여 트랜잭션
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub text: &'a str,
    pub parameters: &'a [Parameter],
    pub transaction: Option<TransactionId>,
}

impl<'a> Statement<'a> {
    pub fn parameter(&self, name: &str) -> Option<&'a DbValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// 커맨드 텍스트에 나타나는 `@name` 자리표시자 목록 (등장 순서, 중복 포함)
pub fn placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| is_placeholder(token))
        .collect()
}

/// Rewrites named placeholders to `?` and returns the values in order of appearance.
///
/// Fails with [`DalError::Build`] when a placeholder has no bound parameter.
pub fn positional<'p>(
    text: &str,
    parameters: &'p [Parameter],
) -> DalResult<(String, Vec<&'p DbValue>)> {
    let mut sql = String::with_capacity(text.len());
    let mut values = Vec::new();
    let mut last = 0;

    for m in PLACEHOLDER.find_iter(text) {
        if !is_placeholder(m.as_str()) {
            continue;
        }
        let value = parameters
            .iter()
            .find(|p| p.name == m.as_str())
            .map(|p| &p.value)
            .ok_or_else(|| DalError::Build(format!("Parameter '{}' is not bound", m.as_str())))?;

        sql.push_str(&text[last..m.start()]);
        sql.push('?');
        values.push(value);
        last = m.end();
    }
    sql.push_str(&text[last..]);

    Ok((sql, values))
}
