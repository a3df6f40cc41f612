//! DAO 계약 계층
//!
//! 호출자가 의존하는 능력 trait(`Readable`, `Writable`)과 엔티티별 구현이 채우는
//! 구현 trait(`ReadSource`, `WriteSink`)을 분리합니다. `ReadOnlyDao`/`Dao` 래퍼가
//! 구현체를 감싸고 능력 trait의 각 메서드를 같은 의미의 구현 메서드로 전달합니다.
//!
//! Primary keys are passed as positional value slices so composite keys such as
//! `(email, password)` need no dedicated key type.

use crate::db::core::types::DbValue;
use crate::error::{DalError, DalResult};

/// 읽기 능력
pub trait Readable<T> {
    /// `Ok(None)` when no row matches the key.
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<T>>;

    /// Empty when the table has no rows.
    fn find_all(&self) -> DalResult<Vec<T>>;

    fn find_by(&self, key: &[DbValue]) -> DalResult<Vec<T>>;

    /// [`Readable::fetch`], with "no row" reported as [`DalError::NotFound`].
    fn fetch_required(&self, key: &[DbValue]) -> DalResult<T> {
        self.fetch(key)?
            .ok_or_else(|| DalError::NotFound(format!("no row for key {}", describe_key(key))))
    }
}

/// 쓰기 능력 - 모든 메서드는 실행기가 보고한 영향받은 행 수를 반환합니다.
///
/// A count of `0` is a valid outcome (for example an update whose key matched
/// nothing), not an error. Callers check it.
pub trait Writable<T> {
    fn insert(&self, entity: &T) -> DalResult<u64>;

    fn update(&self, entity: &T) -> DalResult<u64>;

    /// Applies a partial value (a JSON object of column → value) to the row at `key`.
    fn patch(&self, partial: &DbValue, key: &[DbValue]) -> DalResult<u64>;

    fn delete(&self, key: &[DbValue]) -> DalResult<u64>;
}

/// 엔티티별 읽기 구현
pub trait ReadSource<T> {
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<T>>;

    fn find_all(&self) -> DalResult<Vec<T>>;

    fn find_by(&self, key: &[DbValue]) -> DalResult<Vec<T>> {
        let _ = key;
        Err(DalError::unsupported("find_by"))
    }
}

/// 엔티티별 쓰기 구현
pub trait WriteSink<T> {
    fn insert(&self, entity: &T) -> DalResult<u64>;

    fn update(&self, entity: &T) -> DalResult<u64>;

    fn patch(&self, partial: &DbValue, key: &[DbValue]) -> DalResult<u64> {
        let _ = (partial, key);
        Err(DalError::unsupported("patch"))
    }

    fn delete(&self, key: &[DbValue]) -> DalResult<u64>;
}

/// 읽기 전용 DAO
///
/// Exposes only [`Readable`]. The wrapped implementation is not reachable through it.
#[derive(Debug, Clone)]
pub struct ReadOnlyDao<S> {
    inner: S,
}

impl<S> ReadOnlyDao<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<T, S: ReadSource<T>> Readable<T> for ReadOnlyDao<S> {
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<T>> {
        self.inner.fetch(key)
    }

    fn find_all(&self) -> DalResult<Vec<T>> {
        self.inner.find_all()
    }

    fn find_by(&self, key: &[DbValue]) -> DalResult<Vec<T>> {
        self.inner.find_by(key)
    }
}

/// 읽기/쓰기 DAO
#[derive(Debug, Clone)]
pub struct Dao<S> {
    inner: S,
}

impl<S> Dao<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Narrows this DAO to its read capability.
    pub fn into_read_only(self) -> ReadOnlyDao<S> {
        ReadOnlyDao::new(self.inner)
    }
}

impl<T, S: ReadSource<T>> Readable<T> for Dao<S> {
    fn fetch(&self, key: &[DbValue]) -> DalResult<Option<T>> {
        self.inner.fetch(key)
    }

    fn find_all(&self) -> DalResult<Vec<T>> {
        self.inner.find_all()
    }

    fn find_by(&self, key: &[DbValue]) -> DalResult<Vec<T>> {
        self.inner.find_by(key)
    }
}

impl<T, S: WriteSink<T>> Writable<T> for Dao<S> {
    fn insert(&self, entity: &T) -> DalResult<u64> {
        self.inner.insert(entity)
    }

    fn update(&self, entity: &T) -> DalResult<u64> {
        self.inner.update(entity)
    }

    fn patch(&self, partial: &DbValue, key: &[DbValue]) -> DalResult<u64> {
        self.inner.patch(partial, key)
    }

    fn delete(&self, key: &[DbValue]) -> DalResult<u64> {
        self.inner.delete(key)
    }
}

/// 기본 키 값 개수 검증
pub fn expect_key_arity(key: &[DbValue], expected: usize) -> DalResult<()> {
    if key.len() == expected {
        Ok(())
    } else {
        Err(DalError::InvalidArgument(format!(
            "expected {} primary key value(s), got {}",
            expected,
            key.len()
        )))
    }
}

fn describe_key(key: &[DbValue]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: i64,
        label: String,
    }

    #[derive(Default)]
    struct TagSource {
        rows: Mutex<Vec<Tag>>,
    }

    impl ReadSource<Tag> for TagSource {
        fn fetch(&self, key: &[DbValue]) -> DalResult<Option<Tag>> {
            expect_key_arity(key, 1)?;
            let id = key[0].as_i64();
            Ok(self.rows.lock().iter().find(|t| Some(t.id) == id).cloned())
        }

        fn find_all(&self) -> DalResult<Vec<Tag>> {
            Ok(self.rows.lock().clone())
        }
    }

    impl WriteSink<Tag> for TagSource {
        fn insert(&self, entity: &Tag) -> DalResult<u64> {
            self.rows.lock().push(entity.clone());
            Ok(1)
        }

        fn update(&self, entity: &Tag) -> DalResult<u64> {
            let mut rows = self.rows.lock();
            match rows.iter_mut().find(|t| t.id == entity.id) {
                Some(row) => {
                    *row = entity.clone();
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn delete(&self, key: &[DbValue]) -> DalResult<u64> {
            expect_key_arity(key, 1)?;
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|t| Some(t.id) != key[0].as_i64());
            Ok((before - rows.len()) as u64)
        }
    }

    #[test]
    fn test_forwarding_through_capabilities() {
        let dao = Dao::new(TagSource::default());
        let tag = Tag {
            id: 1,
            label: "new".to_string(),
        };

        assert_eq!(dao.insert(&tag).unwrap(), 1);
        assert_eq!(dao.fetch(&[json!(1)]).unwrap(), Some(tag.clone()));
        assert_eq!(Readable::<Tag>::find_all(&dao).unwrap().len(), 1);
        assert_eq!(Writable::<Tag>::delete(&dao, &[json!(1)]).unwrap(), 1);
        assert!(Readable::<Tag>::find_all(&dao).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_missing_is_none_and_required_is_not_found() {
        let dao = ReadOnlyDao::new(TagSource::default());
        assert_eq!(dao.fetch(&[json!(42)]).unwrap(), None::<Tag>);
        assert!(matches!(
            Readable::<Tag>::fetch_required(&dao, &[json!(42)]),
            Err(DalError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_without_match_reports_zero() {
        let dao = Dao::new(TagSource::default());
        let ghost = Tag {
            id: 9,
            label: "ghost".to_string(),
        };
        assert_eq!(dao.update(&ghost).unwrap(), 0);
    }

    #[test]
    fn test_unimplemented_methods_fail_fast() {
        let dao = Dao::new(TagSource::default());
        assert!(matches!(
            Readable::<Tag>::find_by(&dao, &[json!(1)]),
            Err(DalError::Unsupported(_))
        ));
        assert!(matches!(
            Writable::<Tag>::patch(&dao, &json!({"label": "x"}), &[json!(1)]),
            Err(DalError::Unsupported(_))
        ));
    }

    #[test]
    fn test_key_arity() {
        assert!(expect_key_arity(&[json!("a"), json!("b")], 2).is_ok());
        assert!(matches!(
            expect_key_arity(&[json!("a")], 2),
            Err(DalError::InvalidArgument(_))
        ));

        let dao = ReadOnlyDao::new(TagSource::default());
        assert!(matches!(
            Readable::<Tag>::fetch(&dao, &[json!(1), json!(2)]),
            Err(DalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_capability_as_trait_object() {
        let dao: Box<dyn Readable<Tag>> = Box::new(Dao::new(TagSource::default()));
        assert!(dao.find_all().unwrap().is_empty());
    }
}
