//! 연결 관리자 동작 설정

use serde::{Deserialize, Serialize};

/// 활성 트랜잭션이 있는 상태에서 새 트랜잭션을 시작할 때의 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NestedBegin {
    /// The new transaction replaces the tracked one. The previous handle stays usable
    /// by whoever holds it but is no longer reachable through the manager.
    #[default]
    Replace,
    /// Beginning while the tracked transaction is still active fails with
    /// `InvalidState`.
    Reject,
}

impl NestedBegin {
    pub fn as_str(&self) -> &'static str {
        match self {
            NestedBegin::Replace => "replace",
            NestedBegin::Reject => "reject",
        }
    }
}

impl std::str::FromStr for NestedBegin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(NestedBegin::Replace),
            "reject" => Ok(NestedBegin::Reject),
            other => Err(format!("unknown nested-begin policy '{}'", other)),
        }
    }
}

/// 연결 관리자 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerOptions {
    /// 중첩 트랜잭션 시작 정책 (기본값: Replace)
    pub nested_begin: NestedBegin,

    /// 커맨드 로깅 활성화 (기본값: true)
    pub log_commands: bool,

    /// 느린 커맨드 경고 임계값 (ms, 기본값: 1000)
    pub slow_command_threshold_ms: u64,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            nested_begin: NestedBegin::default(),
            log_commands: true,
            slow_command_threshold_ms: 1000,
        }
    }
}

impl ManagerOptions {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("DAL_NESTED_BEGIN") {
            if let Ok(policy) = val.parse() {
                options.nested_begin = policy;
            }
        }

        if let Ok(val) = std::env::var("DAL_LOG_COMMANDS") {
            options.log_commands = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("DAL_SLOW_COMMAND_MS") {
            if let Ok(ms) = val.parse() {
                options.slow_command_threshold_ms = ms;
            }
        }

        options
    }

    pub fn with_nested_begin(mut self, policy: NestedBegin) -> Self {
        self.nested_begin = policy;
        self
    }
}
