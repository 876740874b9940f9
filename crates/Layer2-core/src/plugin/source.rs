//! Plugin Source - 설치 소스 위치 해석
//!
//! 지원 형식:
//! - `user/repo`
//! - `user/repo:subdir`
//! - `https://host/user/repo(.git)` (콜론 분리 없음)
//! - 존재하는 로컬 경로 (절대 경로나 `.`으로 시작하면 우선, 그 외에는
//!   단축 표기로 해석되지 않을 때만)

use std::fmt;
use std::path::{Component, Path, PathBuf};
use tickr_foundation::{Error, Result};

/// 소스 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// `user/repo` 단축 표기
    Shorthand { user: String, repo: String },
    /// 전체 원격 URL
    Url(String),
    /// 로컬 디렉토리
    Local(PathBuf),
}

/// 해석된 설치 소스
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    pub kind: SourceKind,
    /// 가져온 트리 안의 하위 디렉토리
    pub subpath: Option<String>,
}

impl PluginSource {
    /// 소스 문자열 해석
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::InvalidInput("Plugin source is empty".to_string()));
        }

        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(Self {
                kind: SourceKind::Url(locator.to_string()),
                subpath: None,
            });
        }

        let path = Path::new(locator);
        let explicit_local = path.is_absolute() || locator.starts_with('.');
        if explicit_local && path.exists() {
            return Ok(Self::local(path));
        }

        match Self::parse_shorthand(locator) {
            Ok(source) => Ok(source),
            Err(_) if path.exists() => Ok(Self::local(path)),
            Err(e) => Err(e),
        }
    }

    fn local(path: &Path) -> Self {
        Self {
            kind: SourceKind::Local(path.to_path_buf()),
            subpath: None,
        }
    }

    fn parse_shorthand(locator: &str) -> Result<Self> {
        let (base, subpath) = match locator.split_once(':') {
            Some((base, sub)) => (base, Some(sub)),
            None => (locator, None),
        };

        let mut parts = base.split('/');
        let (Some(user), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid_locator(locator));
        };
        if user.is_empty() || repo.is_empty() || user.starts_with('.') || repo.starts_with('.') {
            return Err(invalid_locator(locator));
        }

        let source = Self {
            kind: SourceKind::Shorthand {
                user: user.to_string(),
                repo: repo.to_string(),
            },
            subpath: None,
        };
        match subpath {
            Some(sub) => source.with_subpath(sub),
            None => Ok(source),
        }
    }

    /// 하위 디렉토리 지정 (빈 문자열이나 `.`이면 루트)
    pub fn with_subpath(mut self, subpath: &str) -> Result<Self> {
        let subpath = subpath.trim().trim_matches('/');
        if subpath.is_empty() || subpath == "." {
            self.subpath = None;
            return Ok(self);
        }

        let escapes = Path::new(subpath)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(Error::InvalidInput(format!(
                "Subdirectory '{}' must be a relative path inside the source",
                subpath
            )));
        }

        self.subpath = Some(subpath.to_string());
        Ok(self)
    }

    /// clone 가능한 원격 URL (로컬 소스는 None)
    pub fn clone_url(&self, repository_base: &str) -> Option<String> {
        match &self.kind {
            SourceKind::Shorthand { user, repo } => Some(format!(
                "{}/{}/{}",
                repository_base.trim_end_matches('/'),
                user,
                repo
            )),
            SourceKind::Url(url) => Some(url.clone()),
            SourceKind::Local(_) => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, SourceKind::Local(_))
    }
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SourceKind::Shorthand { user, repo } => write!(f, "{}/{}", user, repo)?,
            SourceKind::Url(url) => write!(f, "{}", url)?,
            SourceKind::Local(path) => write!(f, "{}", path.display())?,
        }
        if let Some(sub) = &self.subpath {
            write!(f, ":{}", sub)?;
        }
        Ok(())
    }
}

fn invalid_locator(locator: &str) -> Error {
    Error::InvalidInput(format!(
        "Unrecognized plugin source '{}' (expected user/repo, user/repo:subdir, a URL or a local path)",
        locator
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shorthand() {
        let source = PluginSource::parse("acme/widget-plugin").unwrap();
        assert_eq!(
            source.kind,
            SourceKind::Shorthand {
                user: "acme".into(),
                repo: "widget-plugin".into()
            }
        );
        assert_eq!(source.subpath, None);
        assert_eq!(
            source.clone_url("https://github.com/").as_deref(),
            Some("https://github.com/acme/widget-plugin")
        );
    }

    #[test]
    fn test_shorthand_with_subpath() {
        let source = PluginSource::parse("acme/plugins:weather").unwrap();
        assert_eq!(source.subpath.as_deref(), Some("weather"));
        assert_eq!(source.to_string(), "acme/plugins:weather");

        let source = PluginSource::parse("acme/plugins:nested/dir/").unwrap();
        assert_eq!(source.subpath.as_deref(), Some("nested/dir"));
    }

    #[test]
    fn test_url_is_not_split_on_colon() {
        let source = PluginSource::parse("https://example.com/acme/widget.git").unwrap();
        assert_eq!(
            source.kind,
            SourceKind::Url("https://example.com/acme/widget.git".into())
        );
        assert!(source.subpath.is_none());
    }

    #[test]
    fn test_local_path() {
        let temp = TempDir::new().unwrap();
        let source = PluginSource::parse(temp.path().to_str().unwrap()).unwrap();
        assert!(source.is_local());
        assert_eq!(source.clone_url("https://github.com"), None);
    }

    #[test]
    fn test_relative_directory_does_not_shadow_shorthand() {
        // 테스트는 크레이트 루트에서 실행되므로 `src/plugin`이 존재
        assert!(Path::new("src/plugin").is_dir());

        let source = PluginSource::parse("src/plugin").unwrap();
        assert_eq!(
            source.kind,
            SourceKind::Shorthand {
                user: "src".into(),
                repo: "plugin".into()
            }
        );

        assert!(PluginSource::parse("./src/plugin").unwrap().is_local());
        // 단축 표기가 될 수 없는 기존 경로는 로컬
        assert!(PluginSource::parse("src").unwrap().is_local());
    }

    #[test]
    fn test_invalid_locators() {
        for bad in ["", "  ", "justaname", "a/b/c", "/repo", "user/", "./missing-dir", "../x"] {
            assert!(
                matches!(PluginSource::parse(bad), Err(Error::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_subpath_cannot_escape() {
        assert!(PluginSource::parse("acme/plugins:../etc").is_err());
        let source = PluginSource::parse("acme/plugins").unwrap();
        assert!(source.clone().with_subpath("/abs/..").is_err());
        assert_eq!(source.with_subpath("").unwrap().subpath, None);
    }
}
