//! 상품 DAO 구현 (읽기 전용)

use crate::model::Product;
use datalayer::db::{expect_key_arity, ConnectionManager, DbValue, ReadSource};
use datalayer::DalResult;
use std::sync::Arc;

/// 상품 테이블 구현 - 조건 검색(`find_by`)은 지원하지 않습니다.
pub struct ProductStore {
    manager: Arc<ConnectionManager>,
}

impl ProductStore {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

impl ReadSource<Product> for ProductStore {
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<Product>> {
        expect_key_arity(key, 1)?;
        let rows = self
            .manager
            .command()?
            .with_command_text("SELECT sku, name, price, on_sale FROM product WHERE sku = @sku")
            .add_parameter("@sku", key[0].clone())
            .build()?
            .execute_query()?;

        rows.first().map(Product::from_row).transpose()
    }

    fn find_all(&self) -> DalResult<Vec<Product>> {
        self.manager
            .command()?
            .with_command_text("SELECT sku, name, price, on_sale FROM product ORDER BY sku")
            .build()?
            .execute_query()?
            .iter()
            .map(Product::from_row)
            .collect()
    }
}
