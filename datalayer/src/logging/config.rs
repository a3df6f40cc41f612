//! 예외 로그 설정

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 예외 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogConfig {
    /// 로그 디렉토리 (기본값: ./logs/errors)
    pub log_dir: PathBuf,

    /// 파일 이름 접두사 (기본값: "exception")
    pub prefix: String,

    /// 날짜/타임스탬프 UTC 사용 여부 (기본값: true)
    pub use_utc: bool,

    /// 로그 보관 일수 (기본값: 7일)
    pub retention_days: u32,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs/errors"),
            prefix: "exception".to_string(),
            use_utc: true,
            retention_days: 7,
        }
    }
}

impl ErrorLogConfig {
    pub fn new(log_dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            log_dir: log_dir.into(),
            prefix: prefix.to_string(),
            ..Self::default()
        }
    }

    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ERROR_LOG_DIR") {
            config.log_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("ERROR_LOG_PREFIX") {
            config.prefix = val;
        }

        if let Ok(val) = std::env::var("ERROR_LOG_USE_UTC") {
            config.use_utc = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("ERROR_LOG_RETENTION_DAYS") {
            if let Ok(days) = val.parse() {
                config.retention_days = days;
            }
        }

        config
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retention_days == 0 {
            return Err(anyhow::anyhow!("retention_days must be greater than 0"));
        }

        if self.prefix.is_empty() {
            return Err(anyhow::anyhow!("prefix must not be empty"));
        }

        if self.prefix.contains(['/', '\\']) {
            return Err(anyhow::anyhow!("prefix must not contain path separators"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ErrorLogConfig::default();
        assert_eq!(config.prefix, "exception");
        assert_eq!(config.retention_days, 7);
        assert!(config.use_utc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ErrorLogConfig::new("/tmp/x", "shop");
        assert!(config.validate().is_ok());

        config.retention_days = 0;
        assert!(config.validate().is_err());

        config.retention_days = 3;
        config.prefix = String::new();
        assert!(config.validate().is_err());

        config.prefix = "a/b".to_string();
        assert!(config.validate().is_err());
    }
}
