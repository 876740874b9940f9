//! Dependency Installer - 플러그인 의존성 설치
//!
//! 선언 파일(기본 `requirements.txt`)을 패키지 매니저로 설치합니다.
//! 실행기를 순서대로 탐색하고, 제한 시간을 넘기면 프로세스를 종료합니다.
//! 실패 메시지에는 항상 수동 설치 명령이 포함됩니다.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tickr_foundation::{DependencySettings, Error, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// 실행기 확인 제한 시간
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 의존성 설치기
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
    settings: DependencySettings,
}

impl DependencyInstaller {
    pub fn new(settings: DependencySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DependencySettings {
        &self.settings
    }

    /// 선언 파일명
    pub fn declaration_file(&self) -> &str {
        &self.settings.declaration_file
    }

    /// 선언 파일 설치
    ///
    /// 성공 시 사용자에게 보여줄 메시지를 반환합니다.
    pub async fn install(&self, declaration: &Path) -> Result<String> {
        let content = tokio::fs::read_to_string(declaration).await?;
        let packages = parse_requirements(&content);
        if packages.is_empty() {
            return Ok("No dependencies to install".to_string());
        }

        let Some(launcher) = self.find_launcher().await else {
            return Err(Error::DependencyInstallFailed(format!(
                "No package manager found (tried: {}).\nInstall the dependencies manually:\n  {}",
                self.settings.launchers.join(", "),
                self.manual_command(None, declaration)
            )));
        };

        let args = self.install_args(declaration);
        info!("Installing {} dependenc(ies) with {}", packages.len(), launcher);
        debug!("{} {:?}", launcher, args);

        let child = Command::new(&launcher)
            .args(&args)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::DependencyInstallFailed(format!(
                    "Could not start {}: {}\nInstall the dependencies manually:\n  {}",
                    launcher,
                    e,
                    self.manual_command(Some(&launcher), declaration)
                ))
            })?;

        let limit = Duration::from_secs(self.settings.timeout_secs);
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("Dependency installation timed out after {:?}", limit);
                return Err(Error::Timeout(format!(
                    "Dependency installation did not finish within {}s. Check your network connection.\nInstall the dependencies manually:\n  {}",
                    self.settings.timeout_secs,
                    self.manual_command(Some(&launcher), declaration)
                )));
            }
        };

        if output.status.success() {
            return Ok(format!("Installed dependencies: {}", packages.join(", ")));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr
        };

        if is_permission_error(&detail) {
            return Err(Error::DependencyInstallFailed(format!(
                "Permission denied while installing dependencies.\n\
                 Run this from an elevated shell:\n  {}\n\
                 or install the packages individually:\n  {}\n\nDetails: {}",
                self.manual_command(Some(&launcher), declaration),
                packages.join(" "),
                detail
            )));
        }

        Err(Error::DependencyInstallFailed(format!(
            "Dependency installation failed.\nInstall the dependencies manually:\n  {}\n\nDetails: {}",
            self.manual_command(Some(&launcher), declaration),
            detail
        )))
    }

    /// 사용 가능한 첫 번째 실행기
    async fn find_launcher(&self) -> Option<String> {
        for launcher in &self.settings.launchers {
            if which::which(launcher).is_err() {
                debug!("Launcher {} not on PATH", launcher);
                continue;
            }

            let probe = Command::new(launcher)
                .args(&self.settings.probe_args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status();

            match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
                Ok(Ok(status)) if status.success() => return Some(launcher.clone()),
                _ => debug!("Launcher {} did not respond to probe", launcher),
            }
        }
        None
    }

    fn install_args(&self, declaration: &Path) -> Vec<String> {
        let file = declaration.to_string_lossy();
        self.settings
            .install_args
            .iter()
            .map(|arg| arg.replace("{file}", &file))
            .collect()
    }

    /// 수동 설치 명령
    pub fn manual_command(&self, launcher: Option<&str>, declaration: &Path) -> String {
        let launcher = launcher
            .map(str::to_string)
            .or_else(|| self.settings.launchers.first().cloned())
            .unwrap_or_default();

        std::iter::once(launcher)
            .chain(self.install_args(declaration))
            .map(|part| {
                if part.contains(' ') {
                    format!("\"{}\"", part)
                } else {
                    part
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 선언 파일에서 패키지 이름 추출 (주석과 버전 조건 제거)
pub fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(|line| {
            let end = line
                .find(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | ';' | '[' | ' '))
                .unwrap_or(line.len());
            let name = line[..end].trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn is_permission_error(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    lower.contains("permission") || lower.contains("access is denied") || lower.contains("errno 13")
}
