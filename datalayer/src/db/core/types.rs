//! Common type definitions for the data access layer
//!
//! Parameter values, result rows and the column accessors used by DAO implementations.

use crate::error::{DalError, DalResult};
use chrono::{DateTime, NaiveDateTime, Utc};

/// 파라미터/컬럼 값 타입 - `Null`이 데이터베이스 NULL 표시
pub type DbValue = serde_json::Value;

/// Identifier the transport assigns to a started transaction.
pub type TransactionId = u64;

/// 이름이 있는 커맨드 파라미터
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: DbValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// Query result row - columns in select-list order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, DbValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// 컬럼 값 설정 (빌더 형태)
    pub fn with(mut self, column: &str, value: impl Into<DbValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// 같은 이름의 컬럼이 있으면 값을 덮어씁니다.
    pub fn insert(&mut self, column: impl Into<String>, value: DbValue) {
        let column = column.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.iter().any(|(name, _)| name == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// First column of the row, used for scalar results.
    pub fn first_value(&self) -> Option<&DbValue> {
        self.values.first().map(|(_, value)| value)
    }

    /// 원시 컬럼 값 조회
    pub fn value(&self, column: &str) -> DalResult<&DbValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| DalError::MissingColumn(column.to_string()))
    }

    fn non_null(&self, column: &str) -> DalResult<Option<&DbValue>> {
        let value = self.value(column)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    // === nullable accessors ===

    pub fn opt_str(&self, column: &str) -> DalResult<Option<String>> {
        match self.non_null(column)? {
            None => Ok(None),
            Some(DbValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(type_error(column, "string")),
        }
    }

    pub fn opt_i64(&self, column: &str) -> DalResult<Option<i64>> {
        match self.non_null(column)? {
            None => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| type_error(column, "integer")),
        }
    }

    /// DECIMAL values may arrive as their exact text form, so numeric strings are parsed.
    pub fn opt_f64(&self, column: &str) -> DalResult<Option<f64>> {
        match self.non_null(column)? {
            None => Ok(None),
            Some(DbValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| type_error(column, "number")),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| type_error(column, "number")),
        }
    }

    /// MySQL의 TINYINT(1)은 0/1 숫자로 돌아오므로 함께 허용합니다.
    pub fn opt_bool(&self, column: &str) -> DalResult<Option<bool>> {
        match self.non_null(column)? {
            None => Ok(None),
            Some(DbValue::Bool(b)) => Ok(Some(*b)),
            Some(v) => match v.as_i64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(type_error(column, "boolean")),
            },
        }
    }

    pub fn opt_datetime(&self, column: &str) -> DalResult<Option<DateTime<Utc>>> {
        match self.non_null(column)? {
            None => Ok(None),
            Some(DbValue::String(s)) => parse_datetime(s)
                .map(Some)
                .ok_or_else(|| type_error(column, "datetime")),
            Some(_) => Err(type_error(column, "datetime")),
        }
    }

    // === defaulting accessors ===

    /// NULL이면 빈 문자열
    pub fn str_or_empty(&self, column: &str) -> DalResult<String> {
        Ok(self.opt_str(column)?.unwrap_or_default())
    }

    pub fn i64_or_zero(&self, column: &str) -> DalResult<i64> {
        Ok(self.opt_i64(column)?.unwrap_or(0))
    }

    pub fn f64_or_zero(&self, column: &str) -> DalResult<f64> {
        Ok(self.opt_f64(column)?.unwrap_or(0.0))
    }

    pub fn bool_or_false(&self, column: &str) -> DalResult<bool> {
        Ok(self.opt_bool(column)?.unwrap_or(false))
    }

    /// NULL이면 현재 시각(UTC)
    pub fn datetime_or_now(&self, column: &str) -> DalResult<DateTime<Utc>> {
        Ok(self.opt_datetime(column)?.unwrap_or_else(Utc::now))
    }
}

impl FromIterator<(String, DbValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, DbValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

fn type_error(column: &str, expected: &'static str) -> DalError {
    DalError::ColumnType {
        column: column.to_string(),
        expected,
    }
}

/// RFC 3339 또는 MySQL DATETIME 텍스트 형식 파싱
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> Row {
        Row::new()
            .with("email", "account1@example.com")
            .with("nick", DbValue::Null)
            .with("points", 42)
            .with("ratio", 0.5)
            .with("active", 1)
            .with("created_at", "2024-03-01 10:20:30")
            .with("updated_at", DbValue::Null)
    }

    #[test]
    fn test_nullable_accessors() {
        let row = sample_row();
        assert_eq!(row.opt_str("email").unwrap().as_deref(), Some("account1@example.com"));
        assert_eq!(row.opt_str("nick").unwrap(), None);
        assert_eq!(row.opt_i64("points").unwrap(), Some(42));
        assert_eq!(row.opt_f64("ratio").unwrap(), Some(0.5));
        assert_eq!(row.opt_bool("active").unwrap(), Some(true));
        let created = row.opt_datetime("created_at").unwrap().unwrap();
        assert_eq!(created.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-01 10:20:30");
    }

    #[test]
    fn test_defaulting_accessors() {
        let row = sample_row();
        assert_eq!(row.str_or_empty("nick").unwrap(), "");
        assert_eq!(Row::new().with("n", DbValue::Null).i64_or_zero("n").unwrap(), 0);
        assert!(!Row::new().with("b", DbValue::Null).bool_or_false("b").unwrap());

        let before = Utc::now();
        let now = row.datetime_or_now("updated_at").unwrap();
        assert!(now >= before);
    }

    #[test]
    fn test_missing_and_mistyped_columns() {
        let row = sample_row();
        assert!(matches!(row.opt_str("missing"), Err(DalError::MissingColumn(c)) if c == "missing"));
        assert!(matches!(row.opt_str("points"), Err(DalError::ColumnType { .. })));
        assert!(matches!(row.opt_i64("email"), Err(DalError::ColumnType { .. })));
        assert!(Row::new().with("b", json!(7)).opt_bool("b").is_err());
    }

    #[test]
    fn test_decimal_text_reads_as_number() {
        let row = Row::new().with("price", "49.50").with("label", "abc");
        assert_eq!(row.opt_f64("price").unwrap(), Some(49.5));
        assert_eq!(row.f64_or_zero("price").unwrap(), 49.5);
        assert!(matches!(
            row.f64_or_zero("label"),
            Err(DalError::ColumnType { expected: "number", .. })
        ));
    }

    #[test]
    fn test_column_order_and_overwrite() {
        let row = Row::new().with("count", 3).with("name", "x").with("count", 4);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["count", "name"]);
        assert_eq!(row.first_value(), Some(&json!(4)));
    }

    #[test]
    fn test_parameter_null_marker() {
        let p = Parameter::new("@x", None::<String>);
        assert!(p.is_null());
        assert!(!Parameter::new("@x", "").is_null());
    }
}
