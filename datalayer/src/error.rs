//! 데이터 접근 계층 에러 정의
//!
//! 연결/트랜잭션 생명주기, 커맨드 빌드, DAO 호출에서 발생하는 모든 에러를 하나의
//! 열거형으로 관리합니다. 제공자(드라이버) 실행 에러는 감싸지 않고 그대로 전달됩니다.

use thiserror::Error;
use tracing::{error, info, warn};

/// 데이터 접근 계층 공통 결과 타입
pub type DalResult<T> = Result<T, DalError>;

/// Boxed provider error, kept as the original driver error.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 데이터 접근 계층 에러
#[derive(Error, Debug)]
pub enum DalError {
    /// 연결 문자열 키가 없거나 해석되지 않음
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 전송 계층이 연결을 열거나 유지하지 못함
    #[error("Connectivity error: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// 폐기되었거나 종료 상태인 리소스에 대한 작업
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 커맨드 텍스트/연결/파라미터 누락
    #[error("Build error: {0}")]
    Build(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// DAO 구현체가 지원하지 않는 작업
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' is not a {expected}")]
    ColumnType { column: String, expected: &'static str },

    /// 드라이버 실행 에러 (구문 오류, 제약 조건 위반 등)
    #[error(transparent)]
    Provider(ProviderError),
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical, // 연결 장애
    High,     // 실행 실패, 프로그래머 오류
    Medium,   // 입력값 오류
    Low,      // 정상 흐름의 일부
}

impl DalError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        DalError::Connectivity {
            message: message.into(),
            source: None,
        }
    }

    pub fn connectivity_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DalError::Connectivity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn provider(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        DalError::Provider(Box::new(source))
    }

    pub fn unsupported(operation: &str) -> Self {
        DalError::Unsupported(operation.to_string())
    }

    /// 에러의 심각도를 반환합니다.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DalError::Configuration(_) | DalError::Connectivity { .. } => ErrorSeverity::Critical,

            DalError::InvalidState(_)
            | DalError::Build(_)
            | DalError::Unsupported(_)
            | DalError::Provider(_) => ErrorSeverity::High,

            DalError::InvalidArgument(_)
            | DalError::MissingColumn(_)
            | DalError::ColumnType { .. } => ErrorSeverity::Medium,

            DalError::NotFound(_) => ErrorSeverity::Low,
        }
    }

    /// Configuration and connectivity failures happen while the connection is being set
    /// up. The manager already hands those to its error sink.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, DalError::Configuration(_) | DalError::Connectivity { .. })
    }

    /// 심각도에 따라 적절한 레벨로 에러를 로깅합니다.
    pub fn log(&self, context: &str) {
        match self.severity() {
            ErrorSeverity::Critical => error!("[CRITICAL] {} - {}", context, self),
            ErrorSeverity::High => error!("[HIGH] {} - {}", context, self),
            ErrorSeverity::Medium => warn!("[MEDIUM] {} - {}", context, self),
            ErrorSeverity::Low => info!("[LOW] {} - {}", context, self),
        }
    }
}

impl From<sqlx::Error> for DalError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => DalError::Configuration(e.to_string()),
            other => DalError::Provider(Box::new(other)),
        }
    }
}

/// 연결 시점의 SQLx 에러를 분류합니다.
///
/// Network, TLS and protocol failures become [`DalError::Connectivity`]; server
/// rejections (bad credentials, unknown database) keep their driver error as source.
pub fn connectivity_from_sqlx(err: sqlx::Error, context: &str) -> DalError {
    match err {
        sqlx::Error::Configuration(e) => DalError::Configuration(format!("{}: {}", context, e)),
        other => DalError::connectivity_with(format!("{}: {}", context, other), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            DalError::Configuration("x".into()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(DalError::connectivity("down").severity(), ErrorSeverity::Critical);
        assert_eq!(DalError::Build("empty".into()).severity(), ErrorSeverity::High);
        assert_eq!(DalError::NotFound("k".into()).severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_setup_failure_classification() {
        assert!(DalError::Configuration("no key".into()).is_setup_failure());
        assert!(DalError::connectivity("refused").is_setup_failure());
        assert!(!DalError::NotFound("k".into()).is_setup_failure());
        assert!(!DalError::provider(std::io::Error::new(std::io::ErrorKind::Other, "dup")).is_setup_failure());
    }

    #[test]
    fn test_connectivity_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DalError::connectivity_with("open failed", io);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Connectivity error: open failed");
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "duplicate key");
        let err = DalError::provider(io);
        assert_eq!(err.to_string(), "duplicate key");
    }
}
