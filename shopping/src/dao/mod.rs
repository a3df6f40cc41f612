//! 엔티티별 DAO

pub mod account_dao;
pub mod product_dao;

pub use account_dao::AccountStore;
pub use product_dao::ProductStore;

use datalayer::db::{ConnectionManager, Dao, ReadOnlyDao};
use std::sync::Arc;

/// 계정 DAO (읽기/쓰기)
pub fn account_dao(manager: Arc<ConnectionManager>) -> Dao<AccountStore> {
    Dao::new(AccountStore::new(manager))
}

/// 상품 DAO (읽기 전용)
pub fn product_dao(manager: Arc<ConnectionManager>) -> ReadOnlyDao<ProductStore> {
    ReadOnlyDao::new(ProductStore::new(manager))
}
