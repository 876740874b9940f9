//! Plugin Settings - 플러그인 서브시스템 설정
//!
//! 설치 위치, 카탈로그 저장소, 의존성 설치 명령 등은 전부 설정값입니다.
//! 컴파일된 상수가 아니라 생성 시점에 `PluginInstaller`로 전달됩니다.

use super::store::ConfigAccess;
use crate::storage::json::APP_DIR_NAME;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// 설정 트리 내 플러그인 설정 위치
pub const PLUGIN_SETTINGS_KEY: &str = "plugins.settings";

// ============================================================================
// PluginSettings
// ============================================================================

/// 플러그인 서브시스템 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSettings {
    /// 플러그인 설치 디렉토리
    pub install_dir: PathBuf,

    /// 추가 검색 디렉토리 (install_dir 다음 순서)
    pub search_dirs: Vec<PathBuf>,

    /// 플러그인 의존 라이브러리를 찾을 디렉토리
    pub library_dirs: Vec<PathBuf>,

    /// 기본 카탈로그 저장소 (user/repo)
    pub catalog_repository: String,

    /// 단축 저장소 참조를 clone URL로 바꿀 때 쓰는 베이스
    pub repository_base: String,

    /// 카탈로그 원본 파일 베이스 URL
    pub raw_content_base: String,

    /// 카탈로그 브랜치
    pub catalog_branch: String,

    /// 카탈로그 파일명
    pub catalog_file: String,

    /// 의존성 설치 설정
    pub dependencies: DependencySettings,
}

impl Default for PluginSettings {
    fn default() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            install_dir: base.join("plugins"),
            search_dirs: Vec::new(),
            library_dirs: vec![base.join("lib")],
            catalog_repository: "tickr-app/tickr-plugins".to_string(),
            repository_base: "https://github.com".to_string(),
            raw_content_base: "https://raw.githubusercontent.com".to_string(),
            catalog_branch: "main".to_string(),
            catalog_file: "plugins.yaml".to_string(),
            dependencies: DependencySettings::default(),
        }
    }
}

impl PluginSettings {
    /// 설정 저장소에서 읽기 (누락/오류 시 기본값)
    pub fn from_config(config: &dyn ConfigAccess) -> Self {
        match config.get(PLUGIN_SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Invalid {} section, using defaults: {}", PLUGIN_SETTINGS_KEY, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// 설치 디렉토리 기준으로 생성
    pub fn with_install_dir(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            ..Self::default()
        }
    }

    /// 검색 순서대로 정렬된 플러그인 디렉토리 (install_dir 먼저)
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.install_dir.clone()];
        for dir in &self.search_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }
}

// ============================================================================
// DependencySettings
// ============================================================================

/// 플러그인 의존성 설치 설정
///
/// `install_args`의 `{file}`은 선언 파일 경로로 치환됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencySettings {
    /// 의존성 선언 파일명
    pub declaration_file: String,

    /// 순서대로 시도할 패키지 매니저 실행기
    pub launchers: Vec<String>,

    /// 실행기 사용 가능 여부 확인 인자
    pub probe_args: Vec<String>,

    /// 설치 명령 인자
    pub install_args: Vec<String>,

    /// 설치 제한 시간 (초)
    pub timeout_secs: u64,
}

impl Default for DependencySettings {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut install_args: Vec<String> = ["-m", "pip", "install", "-r", "{file}"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        // Windows에서는 권한 문제를 피하기 위해 사용자 영역에 설치
        #[cfg(windows)]
        install_args.push("--user".to_string());

        Self {
            declaration_file: "requirements.txt".to_string(),
            launchers: vec!["python3".into(), "python".into(), "py".into()],
            probe_args: vec!["--version".into()],
            install_args,
            timeout_secs: 120,
        }
    }
}
