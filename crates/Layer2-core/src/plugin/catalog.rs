//! Plugin Catalog - 원격 플러그인 목록
//!
//! 카탈로그 문서 형식:
//!
//! ```yaml
//! repository: acme/tickr-plugins
//! plugins:
//!   - name: weather
//!     version: 1.2.0
//!     description: Shows the weather
//!     path: weather        # 생략 시 name, 빈 값이면 저장소 루트
//! ```

use super::manifest::UNKNOWN_VERSION;
use super::source::PluginSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tickr_foundation::{Error, PluginSettings, Result};
use tracing::{debug, warn};

/// 카탈로그 요청 제한 시간
const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// 카탈로그 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCatalogEntry {
    pub name: String,
    pub version: String,
    pub description: String,
    /// 설치 소스 저장소
    pub repository: String,
    /// 저장소 내 하위 디렉토리
    pub path: String,
}

impl RemoteCatalogEntry {
    /// 설치 소스 (`repository` + `path`)
    pub fn source(&self) -> Result<PluginSource> {
        entry_source(&self.name, &self.repository, &self.path)
    }

    /// 표시용 설치 위치 (`repository:path`)
    pub fn install_locator(&self) -> String {
        if self.path.is_empty() {
            self.repository.clone()
        } else {
            format!("{}:{}", self.repository, self.path)
        }
    }
}

/// 카탈로그 항목의 설치 소스
///
/// `repository`가 비어 있으면 (문서에 `repository`가 없는 직접 YAML URL
/// 카탈로그) 설치할 수 없습니다.
pub(crate) fn entry_source(name: &str, repository: &str, path: &str) -> Result<PluginSource> {
    if repository.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "Catalog entry '{}' has no repository; add a top-level 'repository' to the catalog",
            name
        )));
    }
    PluginSource::parse(repository)?.with_subpath(path)
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    repository: Option<String>,
    plugins: Option<Vec<serde_yaml::Value>>,
}

/// 카탈로그 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogLocation {
    pub url: String,
    /// 항목의 기본 저장소
    pub repository: String,
}

/// 카탈로그 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    repository_base: String,
    raw_content_base: String,
    branch: String,
    file: String,
}

impl CatalogClient {
    pub fn new(settings: &PluginSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CATALOG_TIMEOUT)
            .user_agent(concat!("tickr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            repository_base: settings.repository_base.trim_end_matches('/').to_string(),
            raw_content_base: settings.raw_content_base.trim_end_matches('/').to_string(),
            branch: settings.catalog_branch.clone(),
            file: settings.catalog_file.clone(),
        })
    }

    /// 카탈로그 가져오기
    pub async fn fetch(&self, repo_ref: &str) -> Result<Vec<RemoteCatalogEntry>> {
        let location = self.locate(repo_ref)?;
        debug!("Fetching plugin catalog from {}", location.url);

        let response = self
            .client
            .get(&location.url)
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("{}: {}", location.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::FetchFailed(format!(
                "{}: HTTP {}",
                location.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::FetchFailed(format!("{}: {}", location.url, e)))?;

        parse_catalog(&body, &location.repository)
    }

    /// 저장소 참조를 카탈로그 URL로 변환
    pub(crate) fn locate(&self, repo_ref: &str) -> Result<CatalogLocation> {
        let trimmed = repo_ref.trim().trim_end_matches('/');

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let lower = trimmed.to_ascii_lowercase();
            if lower.ends_with(".yaml") || lower.ends_with(".yml") {
                // 저장소는 문서의 `repository`로만 알 수 있음
                return Ok(CatalogLocation {
                    url: trimmed.to_string(),
                    repository: String::new(),
                });
            }

            let prefix = format!("{}/", self.repository_base);
            let shorthand = trimmed
                .strip_prefix(&prefix)
                .map(|rest| rest.trim_end_matches(".git"))
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Catalog reference '{}' is neither user/repo, a {} URL nor a .yaml URL",
                        repo_ref, self.repository_base
                    ))
                })?;
            return self.locate_shorthand(shorthand, repo_ref);
        }

        self.locate_shorthand(trimmed, repo_ref)
    }

    fn locate_shorthand(&self, shorthand: &str, original: &str) -> Result<CatalogLocation> {
        let parts: Vec<&str> = shorthand.split('/').collect();
        match parts.as_slice() {
            [user, repo] if !user.is_empty() && !repo.is_empty() => Ok(CatalogLocation {
                url: format!(
                    "{}/{}/{}/{}/{}",
                    self.raw_content_base, user, repo, self.branch, self.file
                ),
                repository: format!("{}/{}", user, repo),
            }),
            _ => Err(Error::InvalidInput(format!(
                "Catalog reference '{}' must look like user/repo",
                original
            ))),
        }
    }
}

/// 카탈로그 문서 파싱
///
/// `plugins` 키가 없으면 에러. 이름 없는 항목은 건너뜁니다.
pub fn parse_catalog(content: &str, default_repository: &str) -> Result<Vec<RemoteCatalogEntry>> {
    let document: Option<CatalogDocument> = serde_yaml::from_str(content)
        .map_err(|e| Error::Catalog(format!("Malformed catalog: {}", e)))?;

    let document = document.ok_or_else(|| Error::Catalog("Catalog is empty".to_string()))?;
    let plugins = document
        .plugins
        .ok_or_else(|| Error::Catalog("Catalog has no 'plugins' list".to_string()))?;

    let repository = document
        .repository
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| default_repository.to_string());

    let entries = plugins
        .iter()
        .filter_map(|raw| {
            let name = scalar(raw.get("name")).filter(|n| !n.is_empty());
            let Some(name) = name else {
                warn!("Skipping catalog entry without a name");
                return None;
            };

            Some(RemoteCatalogEntry {
                version: scalar(raw.get("version")).unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
                description: scalar(raw.get("description")).unwrap_or_default(),
                // 빈 path는 저장소 루트
                path: match raw.get("path") {
                    Some(path) => scalar(Some(path)).unwrap_or_default(),
                    None => name.clone(),
                },
                repository: repository.clone(),
                name,
            })
        })
        .collect();

    Ok(entries)
}

fn scalar(value: Option<&serde_yaml::Value>) -> Option<String> {
    match value? {
        serde_yaml::Value::String(s) => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
