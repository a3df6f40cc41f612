//! 예외 로그 싱크
//!
//! 연결 설정 실패 같은 오류를 날짜별 파일에 기록합니다. 새 항목은 파일 맨 앞에
//! 추가되므로 파일의 첫 항목이 항상 가장 최근 오류입니다.
//!
//! # 사용 예시
//! ```no_run
//! use datalayer::logging::{ErrorLogConfig, ErrorSink, FileErrorLog};
//!
//! let log = FileErrorLog::new(ErrorLogConfig::from_env()).unwrap();
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
//! log.record(&err);
//! ```

pub mod config;
pub mod formatter;
pub mod rotation;
pub mod writer;

pub use config::ErrorLogConfig;
pub use formatter::ErrorLogEntry;
pub use rotation::LogFileLocator;
pub use writer::{FileErrorLog, InMemoryErrorLog};

/// 오류 기록 대상
///
/// Recording never fails from the caller's point of view. Implementations report
/// their own write failures through `tracing`.
pub trait ErrorSink: Send + Sync {
    fn record(&self, error: &(dyn std::error::Error + 'static));
}
