//! Error types for Tickr
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Tickr 에러 타입
///
/// 호스트 경계를 넘는 모든 실패는 사람이 읽을 수 있는 메시지를 담습니다.
/// 호스트는 에러 타입을 해석하지 않고 메시지를 그대로 표시하면 됩니다.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 플러그인 관련
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Plugin '{0}' is already installed")]
    AlreadyInstalled(String),

    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Failed to load plugin: {0}")]
    PluginLoad(String),

    #[error("Plugin '{0}' failed to initialize")]
    InitializationFailed(String),

    #[error("Operation already in progress for '{0}'")]
    Busy(String),

    // ========================================================================
    // 원격 소스 관련
    // ========================================================================
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 의존성 설치
    // ========================================================================
    #[error("Dependency installation failed: {0}")]
    DependencyInstallFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::FetchFailed(_) | Error::Http(_) | Error::Busy(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::AlreadyInstalled(_)
                | Error::InvalidPlugin(_)
                | Error::InvalidInput(_)
                | Error::Busy(_)
        )
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
