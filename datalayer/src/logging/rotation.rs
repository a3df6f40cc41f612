//! 날짜별 로그 파일 위치와 보관 정책
//!
//! 파일 이름은 `<prefix>_<yyyy-mm-dd>.log` 형식이며, `retention_days`보다 오래된
//! 파일은 정리 대상입니다.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::logging::config::ErrorLogConfig;

/// 로그 파일 위치 결정자
#[derive(Debug, Clone)]
pub struct LogFileLocator {
    config: ErrorLogConfig,
}

impl LogFileLocator {
    pub fn new(config: ErrorLogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ErrorLogConfig {
        &self.config
    }

    pub fn log_dir(&self) -> &Path {
        &self.config.log_dir
    }

    /// 타임스탬프가 속한 달력 날짜 (UTC 또는 로컬)
    pub fn date_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        if self.config.use_utc {
            timestamp.date_naive()
        } else {
            timestamp.with_timezone(&Local).date_naive()
        }
    }

    /// 로그 파일 경로 생성
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        let filename = format!("{}_{}.log", self.config.prefix, date.format("%Y-%m-%d"));
        self.config.log_dir.join(filename)
    }

    /// 디렉토리를 만들고 해당 시각의 파일 경로를 반환합니다.
    pub fn prepare(&self, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.log_dir).with_context(|| {
            format!("로그 디렉토리 생성 실패: {}", self.config.log_dir.display())
        })?;
        Ok(self.path_for(self.date_of(timestamp)))
    }

    /// 파일 이름에서 날짜 추출 - 이 로그의 파일이 아니면 `None`
    pub fn parse_date(&self, file_name: &str) -> Option<NaiveDate> {
        let date = file_name
            .strip_prefix(self.config.prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(".log")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// 보관 정책에 따른 오래된 로그 파일 정리
    ///
    /// Removes this log's files dated more than `retention_days` before `today`.
    /// Files of other prefixes are left alone.
    pub fn cleanup(&self, today: NaiveDate) -> Result<usize> {
        let dir = &self.config.log_dir;
        if !dir.exists() {
            return Ok(0);
        }

        let cutoff = today - Duration::days(self.config.retention_days as i64);
        let mut deleted_count = 0;

        let entries = fs::read_dir(dir)
            .with_context(|| format!("로그 디렉토리 읽기 실패: {}", dir.display()))?;

        for entry in entries {
            let entry = entry.context("디렉토리 항목 읽기 실패")?;
            let file_name = entry.file_name();
            let Some(date) = file_name.to_str().and_then(|name| self.parse_date(name)) else {
                continue;
            };

            if date < cutoff {
                match fs::remove_file(entry.path()) {
                    Ok(()) => {
                        deleted_count += 1;
                        debug!(path = %entry.path().display(), "오래된 로그 파일 삭제됨");
                    }
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "로그 파일 삭제 실패");
                    }
                }
            }
        }

        Ok(deleted_count)
    }
}
