//! 예외 로그 기록기
//!
//! `FileErrorLog` writes the new entry followed by the previous file content to a
//! temporary file in the same directory, then renames it over the daily file. A reader
//! never sees a half-written file. One process-wide lock covers that cycle, so several
//! `FileErrorLog` values pointing at the same file never drop each other's entries.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::error::Error;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::logging::config::ErrorLogConfig;
use crate::logging::formatter::ErrorLogEntry;
use crate::logging::rotation::LogFileLocator;
use crate::logging::ErrorSink;

lazy_static! {
    /// Held for every read-prepend-rename cycle in the process.
    static ref WRITE_LOCK: Mutex<()> = Mutex::new(());
}

/// 날짜별 파일 예외 로그
#[derive(Debug)]
pub struct FileErrorLog {
    locator: LogFileLocator,
    last_cleanup: Mutex<Option<NaiveDate>>,
}

impl FileErrorLog {
    pub fn new(config: ErrorLogConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            locator: LogFileLocator::new(config),
            last_cleanup: Mutex::new(None),
        })
    }

    pub fn locator(&self) -> &LogFileLocator {
        &self.locator
    }

    /// 오류를 현재 시각으로 기록하고 파일 경로를 반환합니다.
    pub fn log(&self, error: &(dyn Error + 'static)) -> Result<PathBuf> {
        self.log_at(error, Utc::now())
    }

    pub fn log_at(&self, error: &(dyn Error + 'static), timestamp: DateTime<Utc>) -> Result<PathBuf> {
        self.write_entry(&ErrorLogEntry::from_error(error, timestamp))
    }

    /// 항목을 해당 날짜 파일의 맨 앞에 추가
    pub fn write_entry(&self, entry: &ErrorLogEntry) -> Result<PathBuf> {
        let _guard = WRITE_LOCK.lock();

        let path = self.locator.prepare(entry.timestamp)?;
        let existing = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("로그 파일 읽기 실패: {}", path.display()))
            }
        };

        let mut temp = NamedTempFile::new_in(self.locator.log_dir())
            .context("임시 로그 파일 생성 실패")?;
        temp.write_all(entry.format(self.locator.config().use_utc).as_bytes())
            .context("로그 항목 쓰기 실패")?;
        temp.write_all(existing.as_bytes())
            .context("기존 로그 내용 쓰기 실패")?;
        temp.flush().context("로그 파일 플러시 실패")?;
        temp.persist(&path)
            .with_context(|| format!("로그 파일 교체 실패: {}", path.display()))?;

        debug!(path = %path.display(), "예외 로그 항목 기록됨");

        let today = self.locator.date_of(entry.timestamp);
        let mut last_cleanup = self.last_cleanup.lock();
        if *last_cleanup != Some(today) {
            *last_cleanup = Some(today);
            match self.locator.cleanup(today) {
                Ok(0) => {}
                Ok(deleted) => debug!(deleted, "오래된 예외 로그 정리 완료"),
                Err(e) => warn!(error = %e, "예외 로그 정리 실패"),
            }
        }

        Ok(path)
    }
}

impl ErrorSink for FileErrorLog {
    fn record(&self, error: &(dyn Error + 'static)) {
        if let Err(e) = self.log(error) {
            warn!(error = %e, original = %error, "예외 로그 기록 실패");
        }
    }
}

/// 메모리 예외 로그 (테스트용) - 최신 항목이 앞에 옵니다.
#[derive(Debug, Default)]
pub struct InMemoryErrorLog {
    entries: Mutex<Vec<ErrorLogEntry>>,
}

impl InMemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl ErrorSink for InMemoryErrorLog {
    fn record(&self, error: &(dyn Error + 'static)) {
        self.entries
            .lock()
            .insert(0, ErrorLogEntry::from_error(error, Utc::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DalError;
    use crate::logging::formatter::ENTRY_SEPARATOR;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_log(dir: &std::path::Path) -> FileErrorLog {
        FileErrorLog::new(ErrorLogConfig::new(dir, "exception")).unwrap()
    }

    #[test]
    fn test_same_day_entries_prepend_into_one_file() {
        let temp = TempDir::new().unwrap();
        let log = test_log(temp.path());
        let base = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();

        let mut paths = Vec::new();
        for (i, message) in ["first", "second", "third"].iter().enumerate() {
            let err = DalError::Configuration(message.to_string());
            let at = base + chrono::Duration::minutes(i as i64);
            paths.push(log.log_at(&err, at).unwrap());
        }

        assert!(paths.iter().all(|p| p == &paths[0]));
        assert_eq!(
            paths[0].file_name().and_then(|n| n.to_str()),
            Some("exception_2026-10-17.log")
        );

        let content = fs::read_to_string(&paths[0]).unwrap();
        let third = content.find("third").unwrap();
        let second = content.find("second").unwrap();
        let first = content.find("first").unwrap();
        assert!(third < second && second < first);
        assert_eq!(content.matches(ENTRY_SEPARATOR).count(), 3);

        let files = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_two_logs_on_one_file_keep_every_entry() {
        let temp = TempDir::new().unwrap();
        let logs = [test_log(temp.path()), test_log(temp.path())];
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();

        std::thread::scope(|scope| {
            for (writer, log) in logs.iter().enumerate() {
                scope.spawn(move || {
                    for i in 0..10 {
                        let err = DalError::Build(format!("writer {} entry {}", writer, i));
                        log.log_at(&err, at).unwrap();
                    }
                });
            }
        });

        let path = logs[0].locator().path_for(at.date_naive());
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.matches(ENTRY_SEPARATOR).count(), 20);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_different_days_use_different_files() {
        let temp = TempDir::new().unwrap();
        let log = test_log(temp.path());
        let err = DalError::InvalidState("closed".to_string());

        let a = log
            .log_at(&err, Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 0).unwrap())
            .unwrap();
        let b = log
            .log_at(&err, Utc.with_ymd_and_hms(2026, 10, 17, 0, 1, 0).unwrap())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs").join("errors");
        let log = test_log(&dir);

        log.record(&DalError::NotFound("x".to_string()));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ErrorLogConfig::default();
        config.retention_days = 0;
        assert!(FileErrorLog::new(config).is_err());
    }

    #[test]
    fn test_memory_log_newest_first() {
        let log = InMemoryErrorLog::new();
        log.record(&DalError::Build("one".to_string()));
        log.record(&DalError::Build("two".to_string()));

        assert_eq!(log.len(), 2);
        let messages = log.messages();
        assert!(messages[0].contains("two"));
        assert!(messages[1].contains("one"));

        log.clear();
        assert!(log.is_empty());
    }
}
