//! 계정 모델

use chrono::{DateTime, Utc};
use datalayer::db::Row;
use datalayer::DalResult;
use serde::{Deserialize, Serialize};

/// 계정 - 기본 키는 (email, password)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// 조회 결과 행에서 계정 생성
    pub fn from_row(row: &Row) -> DalResult<Self> {
        Ok(Self {
            email: row.str_or_empty("email")?,
            password: row.str_or_empty("password")?,
            name: row.opt_str("name")?,
            created_at: row.datetime_or_now("created_at")?,
        })
    }
}
