//! 계정 DAO 구현

use crate::model::Account;
use datalayer::db::{expect_key_arity, ConnectionManager, DbValue, ReadSource, WriteSink};
use datalayer::{DalError, DalResult};
use std::sync::Arc;
use tracing::debug;

const SELECT_ACCOUNT: &str = "SELECT email, password, name, created_at FROM account";

/// Columns `patch` may change.
const PATCHABLE_COLUMNS: &[&str] = &["name", "password"];

/// 계정 테이블 구현
pub struct AccountStore {
    manager: Arc<ConnectionManager>,
}

impl AccountStore {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    fn query(&self, sql: &str, key: &[DbValue]) -> DalResult<Vec<Account>> {
        let mut builder = self.manager.command()?.with_command_text(sql);
        if let Some(email) = key.first() {
            builder = builder.add_parameter("@email", email.clone());
        }
        if let Some(password) = key.get(1) {
            builder = builder.add_parameter("@password", password.clone());
        }

        builder
            .build()?
            .execute_query()?
            .iter()
            .map(Account::from_row)
            .collect()
    }

    fn created_at(account: &Account) -> String {
        account.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl ReadSource<Account> for AccountStore {
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<Account>> {
        expect_key_arity(key, 2)?;
        let sql = format!("{} WHERE email = @email AND password = @password", SELECT_ACCOUNT);
        Ok(self.query(&sql, key)?.into_iter().next())
    }

    fn find_all(&self) -> DalResult<Vec<Account>> {
        self.query(&format!("{} ORDER BY email", SELECT_ACCOUNT), &[])
    }

    /// `[email]` matches every account with that email, `[email, password]` the exact key.
    fn find_by(&self, key: &[DbValue]) -> DalResult<Vec<Account>> {
        let sql = match key.len() {
            1 => format!("{} WHERE email = @email ORDER BY email", SELECT_ACCOUNT),
            2 => format!(
                "{} WHERE email = @email AND password = @password",
                SELECT_ACCOUNT
            ),
            n => {
                return Err(DalError::InvalidArgument(format!(
                    "expected 1 or 2 primary key value(s), got {}",
                    n
                )))
            }
        };
        self.query(&sql, key)
    }
}

impl WriteSink<Account> for AccountStore {
    fn insert(&self, entity: &Account) -> DalResult<u64> {
        self.manager
            .command()?
            .with_command_text(
                "INSERT INTO account (email, password, name, created_at) \
                 VALUES (@email, @password, @name, @created_at)",
            )
            .add_parameter("@email", entity.email.as_str())
            .add_parameter("@password", entity.password.as_str())
            .add_parameter("@name", entity.name.clone())
            .add_parameter("@created_at", Self::created_at(entity))
            .build()?
            .execute_non_query()
    }

    fn update(&self, entity: &Account) -> DalResult<u64> {
        self.manager
            .command()?
            .with_command_text(
                "UPDATE account SET name = @name, created_at = @created_at \
                 WHERE email = @email AND password = @password",
            )
            .add_parameter("@name", entity.name.clone())
            .add_parameter("@created_at", Self::created_at(entity))
            .add_parameter("@email", entity.email.as_str())
            .add_parameter("@password", entity.password.as_str())
            .build()?
            .execute_non_query()
    }

    /// `partial` is an object of column → new value, limited to `name` and `password`.
    fn patch(&self, partial: &DbValue, key: &[DbValue]) -> DalResult<u64> {
        expect_key_arity(key, 2)?;
        let fields = partial
            .as_object()
            .filter(|fields| !fields.is_empty())
            .ok_or_else(|| {
                DalError::InvalidArgument("patch expects a non-empty object".to_string())
            })?;

        let mut assignments = Vec::with_capacity(fields.len());
        for column in fields.keys() {
            if !PATCHABLE_COLUMNS.contains(&column.as_str()) {
                return Err(DalError::InvalidArgument(format!(
                    "column '{}' cannot be patched",
                    column
                )));
            }
            assignments.push(format!("{0} = @new_{0}", column));
        }

        let sql = format!(
            "UPDATE account SET {} WHERE email = @email AND password = @password",
            assignments.join(", ")
        );
        debug!(columns = fields.len(), "계정 부분 수정");

        let mut builder = self
            .manager
            .command()?
            .with_command_text(sql)
            .add_parameter("@email", key[0].clone())
            .add_parameter("@password", key[1].clone());
        for (column, value) in fields {
            builder = builder.add_parameter(format!("@new_{}", column), value.clone());
        }
        builder.build()?.execute_non_query()
    }

    fn delete(&self, key: &[DbValue]) -> DalResult<u64> {
        expect_key_arity(key, 2)?;
        self.manager
            .command()?
            .with_command_text("DELETE FROM account WHERE email = @email AND password = @password")
            .add_parameter("@email", key[0].clone())
            .add_parameter("@password", key[1].clone())
            .build()?
            .execute_non_query()
    }
}
