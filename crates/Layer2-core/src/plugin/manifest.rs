//! Plugin Manifest - 플러그인 메타데이터 정의
//!
//! 설치된 플러그인 디렉토리마다 `plugin.yaml`이 하나 있습니다.
//! 설치 시 소스에서 함께 복사되며 이후 코어는 읽기만 합니다.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tickr_foundation::{Error, Result};

/// 매니페스트 파일명
pub const MANIFEST_FILE: &str = "plugin.yaml";

/// 매니페스트에 버전이 없을 때 사용하는 값
pub const UNKNOWN_VERSION: &str = "0.0.0";

/// 플러그인 매니페스트
///
/// `name`만 필수입니다. 나머지 필드가 없으면 코드에 선언된 기본값이 쓰입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// 고유 이름 (설치 디렉토리 이름)
    pub name: String,

    /// 버전 (예: "1.2.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// 작성자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// 설명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 업데이트 출처 저장소
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// 엔트리 라이브러리 파일 (패키지 디렉토리 기준 상대 경로)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// 필드 검증 전 원시 구조
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<serde_yaml::Value>,
    author: Option<String>,
    description: Option<String>,
    repository: Option<String>,
    entry: Option<String>,
}

impl PluginManifest {
    /// 새 매니페스트 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            author: None,
            description: None,
            repository: None,
            entry: None,
        }
    }

    /// 빌더 패턴: 버전 설정
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 빌더 패턴: 작성자 설정
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// 빌더 패턴: 설명 설정
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 빌더 패턴: 저장소 설정
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// YAML 문자열 파싱
    ///
    /// `name`이 없거나 비어 있으면 `InvalidPlugin`.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: Option<RawManifest> = serde_yaml::from_str(content)
            .map_err(|e| Error::InvalidPlugin(format!("{} is malformed: {}", MANIFEST_FILE, e)))?;
        let raw = raw.ok_or_else(|| Error::InvalidPlugin(format!("{} is empty", MANIFEST_FILE)))?;

        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::InvalidPlugin(format!("{} does not specify a name", MANIFEST_FILE))
            })?;

        Ok(Self {
            name,
            version: raw.version.and_then(yaml_scalar_to_string),
            author: raw.author,
            description: raw.description,
            repository: raw.repository,
            entry: raw.entry,
        })
    }

    /// 디렉토리의 매니페스트 읽기
    ///
    /// 파일이 없으면 `InvalidPlugin`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Err(Error::InvalidPlugin(format!(
                "{} not found in {}",
                MANIFEST_FILE,
                dir.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// 디렉토리 내 매니페스트 경로
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// 표시용 버전 (없으면 "0.0.0")
    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }
}

/// `version: 1.2` 처럼 숫자로 파싱된 값도 문자열로 받아들임
fn yaml_scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 설치된 플러그인 (디렉토리 이름 태그 포함)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    /// 설치 디렉토리 이름
    pub directory: String,

    /// 설치 경로
    pub path: PathBuf,

    /// 매니페스트
    pub manifest: PluginManifest,
}

impl InstalledPlugin {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> &str {
        self.manifest.version_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = PluginManifest::parse(
            r#"
name: weather
version: "1.2.0"
author: Someone
description: Shows the weather
repository: someone/tickr-plugins
"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "weather");
        assert_eq!(manifest.version_or_default(), "1.2.0");
        assert_eq!(manifest.repository.as_deref(), Some("someone/tickr-plugins"));
        assert!(manifest.entry.is_none());
    }

    #[test]
    fn test_numeric_version_is_accepted() {
        let manifest = PluginManifest::parse("name: clock\nversion: 1.5\n").unwrap();
        assert_eq!(manifest.version.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let err = PluginManifest::parse("version: 1.0.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));

        let err = PluginManifest::parse("name: '  '\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));

        let err = PluginManifest::parse("").unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));
    }

    #[test]
    fn test_malformed_yaml_is_invalid() {
        let err = PluginManifest::parse("name: [unclosed").unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));
    }

    #[test]
    fn test_from_dir() {
        let temp = TempDir::new().unwrap();
        assert!(PluginManifest::from_dir(temp.path()).is_err());

        std::fs::write(temp.path().join(MANIFEST_FILE), "name: hello\n").unwrap();
        let manifest = PluginManifest::from_dir(temp.path()).unwrap();
        assert_eq!(manifest.name, "hello");
        assert_eq!(manifest.version_or_default(), UNKNOWN_VERSION);
    }
}
