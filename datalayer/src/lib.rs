//! 데이터 접근 계층
//!
//! 단일 연결과 최대 하나의 추적 트랜잭션을 관리하는 생명주기 관리자, 생성 시점의
//! 연결/트랜잭션에 바인딩되는 커맨드 빌더, 능력 trait 기반 DAO 계약, 날짜별 예외
//! 로그를 제공합니다.
//!
//! ```no_run
//! use datalayer::config::EnvConnectionStrings;
//! use datalayer::db::{ConnectionManager, MySqlConnector};
//! use std::sync::Arc;
//!
//! # fn main() -> datalayer::DalResult<()> {
//! let manager = ConnectionManager::new(
//!     Arc::new(EnvConnectionStrings::load()),
//!     Arc::new(MySqlConnector::new()),
//! );
//! manager.configure("shopping")?;
//!
//! let tx = manager.begin_transaction()?;
//! let affected = manager
//!     .command()?
//!     .with_command_text("UPDATE account SET name = @name WHERE email = @email")
//!     .add_parameter("@name", "Kim")
//!     .add_parameter("@email", "account1@example.com")
//!     .build()?
//!     .execute_non_query()?;
//! if affected == 1 {
//!     tx.commit()?;
//! } else {
//!     tx.rollback()?;
//! }
//! manager.dispose()
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{DalError, DalResult, ErrorSeverity};
