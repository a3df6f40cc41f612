//! 예외 로그 항목 포맷터

use chrono::{DateTime, Local, Utc};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

/// 항목 구분선
pub const ENTRY_SEPARATOR: &str = "----------------------------------------";

/// 예외 로그 항목
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// `source()` chain, outermost first
    pub causes: Vec<String>,
    /// Only captured when `RUST_BACKTRACE` is enabled.
    pub backtrace: Option<String>,
}

impl ErrorLogEntry {
    pub fn new(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            causes: Vec::new(),
            backtrace: None,
        }
    }

    /// 오류와 그 원인 체인으로 항목 생성
    pub fn from_error(error: &(dyn Error + 'static), timestamp: DateTime<Utc>) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            timestamp,
            message: error.to_string(),
            causes,
            backtrace,
        }
    }

    /// 텍스트 형식으로 변환 - 마지막 줄은 항상 구분선입니다.
    pub fn format(&self, use_utc: bool) -> String {
        let timestamp = if use_utc {
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
        } else {
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f %:z")
                .to_string()
        };

        let mut text = format!("[{}] ERROR {}\n", timestamp, self.message);
        for cause in &self.causes {
            text.push_str(&format!("  Caused by: {}\n", cause));
        }
        if let Some(backtrace) = &self.backtrace {
            text.push_str("  Stack trace:\n");
            for line in backtrace.lines() {
                text.push_str("    ");
                text.push_str(line);
                text.push('\n');
            }
        }
        text.push_str(ENTRY_SEPARATOR);
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DalError;
    use chrono::TimeZone;

    #[test]
    fn test_from_error_collects_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DalError::connectivity_with("cannot reach db.local:3306", io);
        let ts = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();

        let entry = ErrorLogEntry::from_error(&err, ts);
        assert!(entry.message.contains("cannot reach db.local:3306"));
        assert_eq!(entry.causes, vec!["refused".to_string()]);
    }

    #[test]
    fn test_format_text() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let mut entry = ErrorLogEntry::new("connection string 'shopping' not found", ts);
        entry.causes.push("inner".to_string());

        let text = entry.format(true);
        assert!(text.starts_with("[2026-10-17 09:30:00.000 UTC] ERROR connection string"));
        assert!(text.contains("  Caused by: inner\n"));
        assert!(text.ends_with(&format!("{}\n", ENTRY_SEPARATOR)));
    }
}
