//! 쇼핑몰 데이터 접근 예제
//!
//! `datalayer` 위에 엔티티별 DAO를 구현합니다. 계정은 (email, password) 복합 키로
//! 읽기/쓰기가 가능하고, 상품은 읽기 전용입니다.

pub mod dao;
pub mod model;

pub use dao::{account_dao, product_dao, AccountStore, ProductStore};
pub use model::{Account, Product};

use datalayer::logging::ErrorSink;
use datalayer::DalError;
use tracing::error;

/// 작업 실패를 로그에 남기고 예외 로그에 기록합니다.
///
/// Setup failures are skipped because the connection manager has already recorded them.
pub fn report_failure(sink: &dyn ErrorSink, context: &str, err: &DalError) {
    error!(error = %err, "{}", context);
    if !err.is_setup_failure() {
        sink.record(err);
    }
}
