//! 데이터베이스 코어 모듈
//!
//! 연결/트랜잭션 생명주기, 커맨드 빌더, 실행기 경계를 담당합니다.

pub mod command;
pub mod connection;
pub mod executor;
pub mod transaction;
pub mod types;

pub use command::{Command, CommandBuilder};
pub use connection::{Connection, ConnectionHandle, ConnectionManager};
pub use executor::{Connector, Statement, Transport};
pub use transaction::{Transaction, TransactionHandle, TransactionState};
pub use types::{DbValue, Parameter, Row, TransactionId};
