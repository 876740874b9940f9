//! Source Fetcher - 원격 소스 가져오기

use async_trait::async_trait;
use std::path::Path;
use tickr_foundation::{Error, Result};
use tracing::debug;

/// 원격 저장소를 로컬 디렉토리로 가져오는 방법
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// `url`의 최신 리비전을 `dest`에 가져옴 (`dest`는 아직 존재하지 않음)
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// `git clone --depth 1` 기반 페처
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl GitFetcher {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// 다른 git 실행 파일 사용
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Cloning {} into {:?}", url, dest);

        let output = tokio::process::Command::new(&self.program)
            .args(["clone", "--depth", "1", "--single-branch", "--quiet", url])
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::FetchFailed(format!("Could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::FetchFailed(format!(
                "Clone of {} failed: {}",
                url,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}
