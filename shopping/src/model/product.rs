use datalayer::db::Row;
use datalayer::DalResult;
use serde::{Deserialize, Serialize};

/// 상품
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub on_sale: bool,
}

impl Product {
    pub fn from_row(row: &Row) -> DalResult<Self> {
        Ok(Self {
            sku: row.str_or_empty("sku")?,
            name: row.str_or_empty("name")?,
            price: row.f64_or_zero("price")?,
            on_sale: row.bool_or_false("on_sale")?,
        })
    }
}
