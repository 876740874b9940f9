//! Plugin Installer - 플러그인 다운로드 및 설치
//!
//! 원격 저장소나 로컬 디렉토리에서 플러그인을 가져와 설치 디렉토리에
//! 복사합니다. 같은 이름에 대한 작업이 겹치면 `Error::Busy`로 거부합니다.
//!
//! 설치 디렉토리 구조:
//!
//! ```text
//! <install_root>/
//! ├── weather/
//! │   ├── plugin.yaml
//! │   ├── libweather.so
//! │   └── requirements.txt    (선택)
//! └── .staging/               (업데이트 중 임시 공간)
//! ```

use super::catalog::{CatalogClient, RemoteCatalogEntry};
use super::deps::DependencyInstaller;
use super::fetch::{GitFetcher, SourceFetcher};
use super::loader::is_valid_name;
use super::manifest::{InstalledPlugin, PluginManifest};
use super::source::{PluginSource, SourceKind};
use super::update::UpdateCandidate;
use super::version;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickr_foundation::{event_names, Error, EventBus, PluginSettings, Result};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// 업데이트 스테이징 디렉토리 이름
const STAGING_DIR: &str = ".staging";

/// 복사 시 제외할 버전 관리 메타데이터
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

// ============================================================================
// InstallOutcome
// ============================================================================

/// 의존성 설치 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    /// 설치됨 (메시지)
    Installed(String),
    /// 실패 (경고 메시지) - 플러그인 설치 자체는 성공
    Failed(String),
}

/// 설치 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub dependencies: Option<DependencyOutcome>,
}

impl InstallOutcome {
    /// 의존성 설치 경고
    pub fn warning(&self) -> Option<&str> {
        match &self.dependencies {
            Some(DependencyOutcome::Failed(message)) => Some(message),
            _ => None,
        }
    }

    /// 사용자에게 보여줄 메시지
    pub fn message(&self) -> String {
        let mut message = format!("Installed plugin '{}' (v{})", self.name, self.version);
        match &self.dependencies {
            Some(DependencyOutcome::Installed(detail)) => {
                message.push('\n');
                message.push_str(detail);
            }
            Some(DependencyOutcome::Failed(detail)) => {
                message.push_str("\nWarning: ");
                message.push_str(detail);
            }
            None => {}
        }
        message
    }
}

// ============================================================================
// In-flight guard
// ============================================================================

/// 진행 중인 이름 집합에서 자동으로 빠지는 가드
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.name);
    }
}

/// 임시 작업 디렉토리 (Drop 시 삭제)
struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    async fn create() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("tickr-plugin-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!("Failed to clean up {:?}: {}", self.path, e);
        }
    }
}

// ============================================================================
// PluginInstaller - 플러그인 설치기
// ============================================================================

/// 플러그인 설치기
pub struct PluginInstaller {
    /// 설치 디렉토리
    install_root: PathBuf,

    /// 플러그인 설정
    settings: PluginSettings,

    /// 원격 소스 페처
    fetcher: Arc<dyn SourceFetcher>,

    /// 카탈로그 클라이언트
    catalog: CatalogClient,

    /// 의존성 설치기
    deps: DependencyInstaller,

    /// 진행 중인 플러그인 이름
    in_flight: Arc<Mutex<HashSet<String>>>,

    /// 이벤트 버스 (선택)
    events: Option<EventBus>,
}

impl PluginInstaller {
    /// 새 설치기 생성 (설치 디렉토리가 없으면 생성)
    pub fn new(settings: PluginSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.install_dir)?;

        Ok(Self {
            install_root: settings.install_dir.clone(),
            catalog: CatalogClient::new(&settings)?,
            deps: DependencyInstaller::new(settings.dependencies.clone()),
            fetcher: Arc::new(GitFetcher::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            events: None,
            settings,
        })
    }

    /// 빌더 패턴: 페처 교체
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// 빌더 패턴: 이벤트 버스
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    // ========================================================================
    // 설치
    // ========================================================================

    /// 소스에서 설치
    ///
    /// `subpath`가 주어지면 `source:subpath` 표기보다 우선합니다.
    pub async fn install_from_source(
        &self,
        locator: &str,
        subpath: Option<&str>,
    ) -> Result<InstallOutcome> {
        let mut source = PluginSource::parse(locator)?;
        if let Some(sub) = subpath {
            source = source.with_subpath(sub)?;
        }
        self.install_source(&source).await
    }

    /// 로컬 디렉토리에서 설치
    pub async fn install_from_local_path(&self, path: &Path) -> Result<InstallOutcome> {
        if !path.is_dir() {
            return Err(Error::NotFound(format!(
                "Plugin directory {} does not exist",
                path.display()
            )));
        }
        info!("Installing plugin from {:?}", path);
        self.install_tree(path).await
    }

    /// 카탈로그 항목 설치 (`repository:path`)
    pub async fn install_from_catalog(&self, entry: &RemoteCatalogEntry) -> Result<InstallOutcome> {
        let source = entry.source()?;
        self.install_source(&source).await
    }

    async fn install_source(&self, source: &PluginSource) -> Result<InstallOutcome> {
        info!("Installing plugin from {}", source);
        let (_workspace, root) = self.materialize(source).await?;
        self.install_tree(&root).await
    }

    /// 소스를 로컬 트리로 준비 (원격이면 임시 디렉토리로 가져옴)
    async fn materialize(&self, source: &PluginSource) -> Result<(Option<TempWorkspace>, PathBuf)> {
        let (workspace, base) = match &source.kind {
            SourceKind::Local(path) => (None, path.clone()),
            _ => {
                let url = source
                    .clone_url(&self.settings.repository_base)
                    .ok_or_else(|| Error::InvalidInput(format!("Cannot fetch {}", source)))?;
                let workspace = TempWorkspace::create().await?;
                let checkout = workspace.path.join("source");
                self.fetcher.fetch(&url, &checkout).await?;
                (Some(workspace), checkout)
            }
        };

        let root = match &source.subpath {
            Some(sub) => {
                let root = base.join(sub);
                if !root.is_dir() {
                    return Err(Error::NotFound(format!(
                        "Subdirectory '{}' not found in {}",
                        sub, source
                    )));
                }
                root
            }
            None => base,
        };

        Ok((workspace, root))
    }

    /// 준비된 트리 설치
    async fn install_tree(&self, root: &Path) -> Result<InstallOutcome> {
        let manifest = PluginManifest::from_dir(root)?;
        ensure_valid_name(&manifest.name)?;
        let _guard = self.begin(&manifest.name)?;

        let dest = self.install_root.join(&manifest.name);
        if dest.exists() {
            return Err(Error::AlreadyInstalled(manifest.name));
        }

        if let Err(e) = copy_dir_recursive(root, &dest).await {
            let _ = fs::remove_dir_all(&dest).await;
            return Err(e);
        }

        let dependencies = self.dependencies_for(&dest).await;
        let outcome = InstallOutcome {
            version: manifest.version_or_default().to_string(),
            name: manifest.name,
            path: dest,
            dependencies,
        };

        info!("Installed plugin {} v{}", outcome.name, outcome.version);
        self.emit(event_names::PLUGIN_INSTALLED, &outcome.name);
        Ok(outcome)
    }

    /// 선언 파일이 있으면 의존성 설치 (실패는 경고로 강등)
    async fn dependencies_for(&self, dir: &Path) -> Option<DependencyOutcome> {
        let declaration = dir.join(self.deps.declaration_file());
        if !declaration.is_file() {
            return None;
        }

        Some(match self.install_dependencies(&declaration).await {
            Ok(message) => DependencyOutcome::Installed(message),
            Err(e) => {
                warn!("Dependency installation failed for {:?}: {}", dir, e);
                DependencyOutcome::Failed(e.to_string())
            }
        })
    }

    /// 의존성 선언 파일 설치
    pub async fn install_dependencies(&self, declaration: &Path) -> Result<String> {
        self.deps.install(declaration).await
    }

    // ========================================================================
    // 제거 / 조회
    // ========================================================================

    /// 플러그인 제거
    ///
    /// 활성 인스턴스는 건드리지 않으므로 호출자가 먼저 언로드해야 합니다.
    pub async fn uninstall(&self, name: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(Error::InvalidInput(format!("Invalid plugin name '{}'", name)));
        }
        let _guard = self.begin(name)?;

        let path = self.install_root.join(name);
        if !path.exists() {
            return Err(Error::NotFound(format!("Plugin '{}' is not installed", name)));
        }

        fs::remove_dir_all(&path).await?;
        info!("Uninstalled plugin {}", name);
        self.emit(event_names::PLUGIN_UNINSTALLED, name);
        Ok(())
    }

    /// 설치된 플러그인의 매니페스트 (없거나 잘못되면 None)
    pub fn get_manifest(&self, name: &str) -> Option<PluginManifest> {
        if !is_valid_name(name) {
            return None;
        }
        PluginManifest::from_dir(&self.install_root.join(name)).ok()
    }

    /// 설치된 플러그인 목록 (디렉토리 이름순)
    pub fn list_installed(&self) -> Vec<InstalledPlugin> {
        let entries = match std::fs::read_dir(&self.install_root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {:?}: {}", self.install_root, e);
                return Vec::new();
            }
        };

        let mut installed: Vec<InstalledPlugin> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let directory = entry.file_name().to_string_lossy().to_string();
                if directory.starts_with('.') {
                    return None;
                }
                let manifest = self.get_manifest(&directory)?;
                Some(InstalledPlugin {
                    directory,
                    path: entry.path(),
                    manifest,
                })
            })
            .collect();

        installed.sort_by(|a, b| a.directory.cmp(&b.directory));
        installed
    }

    // ========================================================================
    // 카탈로그 / 업데이트
    // ========================================================================

    /// 원격 카탈로그 가져오기
    pub async fn fetch_catalog(&self, repo_ref: &str) -> Result<Vec<RemoteCatalogEntry>> {
        self.catalog.fetch(repo_ref).await
    }

    /// 업데이트 확인 (기본값: 설정의 카탈로그 저장소)
    pub async fn check_for_updates(&self, repo_ref: Option<&str>) -> Result<Vec<UpdateCandidate>> {
        let installed = self.list_installed();
        if installed.is_empty() {
            return Ok(Vec::new());
        }

        let repo_ref = repo_ref.unwrap_or(&self.settings.catalog_repository);
        let remote: HashMap<String, RemoteCatalogEntry> = self
            .fetch_catalog(repo_ref)
            .await?
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect();

        let candidates: Vec<UpdateCandidate> = installed
            .iter()
            .filter_map(|local| {
                let entry = remote.get(local.name())?;
                if !version::is_newer(&entry.version, local.version()) {
                    return None;
                }
                Some(UpdateCandidate {
                    name: local.name().to_string(),
                    current_version: local.version().to_string(),
                    latest_version: entry.version.clone(),
                    description: entry.description.clone(),
                    repository: entry.repository.clone(),
                    path: entry.path.clone(),
                })
            })
            .collect();

        debug!("{} update(s) available from {}", candidates.len(), repo_ref);
        Ok(candidates)
    }

    /// 설치된 플러그인을 새 버전으로 교체
    ///
    /// 새 버전을 `.staging/`에 준비한 뒤 rename으로 교체합니다. 어느 단계에서
    /// 실패해도 이전 디렉토리가 그대로 남습니다.
    pub async fn replace_from_source(
        &self,
        name: &str,
        source: &PluginSource,
    ) -> Result<InstallOutcome> {
        ensure_valid_name(name)?;
        let _guard = self.begin(name)?;

        let (_workspace, root) = self.materialize(source).await?;
        let manifest = PluginManifest::from_dir(&root)?;
        if manifest.name != name {
            return Err(Error::InvalidPlugin(format!(
                "Update for '{}' provides plugin '{}'",
                name, manifest.name
            )));
        }

        let staging_root = self.install_root.join(STAGING_DIR);
        fs::create_dir_all(&staging_root).await?;
        let token = uuid::Uuid::new_v4().simple().to_string();
        let staged = staging_root.join(format!("{}-{}", name, token));
        let backup = staging_root.join(format!("{}-backup-{}", name, token));

        if let Err(e) = copy_dir_recursive(&root, &staged).await {
            let _ = fs::remove_dir_all(&staged).await;
            return Err(e);
        }

        let current = self.install_root.join(name);
        let had_current = current.exists();
        if had_current {
            if let Err(e) = fs::rename(&current, &backup).await {
                let _ = fs::remove_dir_all(&staged).await;
                return Err(e.into());
            }
        }

        if let Err(e) = fs::rename(&staged, &current).await {
            if had_current {
                if let Err(restore) = fs::rename(&backup, &current).await {
                    error!(
                        "Failed to restore {} from {:?}: {}",
                        name, backup, restore
                    );
                }
            }
            let _ = fs::remove_dir_all(&staged).await;
            return Err(e.into());
        }

        if had_current {
            if let Err(e) = fs::remove_dir_all(&backup).await {
                warn!("Failed to remove backup {:?}: {}", backup, e);
            }
        }
        // 비어 있을 때만 성공
        let _ = fs::remove_dir(&staging_root).await;

        let dependencies = self.dependencies_for(&current).await;
        let outcome = InstallOutcome {
            name: manifest.name.clone(),
            version: manifest.version_or_default().to_string(),
            path: current,
            dependencies,
        };

        info!("Replaced plugin {} with v{}", name, outcome.version);
        Ok(outcome)
    }

    // ========================================================================
    // 유틸리티
    // ========================================================================

    /// 이름에 대한 작업 시작 (이미 진행 중이면 Busy)
    pub(crate) fn begin(&self, name: &str) -> Result<InFlightGuard> {
        let mut set = self.in_flight.lock();
        if !set.insert(name.to_string()) {
            return Err(Error::Busy(name.to_string()));
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            name: name.to_string(),
        })
    }

    fn emit(&self, event: &str, name: &str) {
        if let Some(events) = &self.events {
            events.emit(event, json!({ "plugin": name }));
        }
    }
}

fn ensure_valid_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidPlugin(format!(
            "'{}' cannot be used as a plugin name",
            name
        )))
    }
}

/// 디렉토리 재귀 복사 (버전 관리 메타데이터 제외)
async fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).await?;

    let mut entries = fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        if VCS_DIRS.iter().any(|vcs| file_name == *vcs) {
            continue;
        }

        let src_path = entry.path();
        let dest_path = dest.join(&file_name);
        let file_type = entry.file_type().await?;
        // 심볼릭 링크는 대상을 따라감
        let is_dir = if file_type.is_symlink() {
            fs::metadata(&src_path).await?.is_dir()
        } else {
            file_type.is_dir()
        };
        if is_dir {
            Box::pin(copy_dir_recursive(&src_path, &dest_path)).await?;
        } else {
            fs::copy(&src_path, &dest_path).await?;
        }
    }

    Ok(())
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tickr_foundation::DependencySettings;

    /// 로컬 디렉토리를 "clone"하는 가짜 페처
    struct DirFetcher {
        repos: HashMap<String, PathBuf>,
    }

    #[async_trait]
    impl SourceFetcher for DirFetcher {
        async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            let src = self
                .repos
                .get(url)
                .ok_or_else(|| Error::FetchFailed(format!("unknown repository {}", url)))?;
            copy_dir_recursive(src, dest).await?;
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::write(dest.join(".git").join("HEAD"), "ref: main").unwrap();
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        installer: PluginInstaller,
    }

    fn write_plugin(dir: &Path, manifest: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("plugin.yaml"), manifest).unwrap();
        std::fs::write(dir.join("payload.bin"), b"v1").unwrap();
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();

        let widget = temp.path().join("repos").join("widget");
        write_plugin(&widget, "name: widget\nversion: 2.0.0\n");

        let bundle = temp.path().join("repos").join("bundle");
        write_plugin(&bundle.join("weather"), "name: weather\nversion: 1.0.0\n");

        let settings = PluginSettings {
            dependencies: DependencySettings {
                launchers: vec!["tickr-missing-launcher".into()],
                ..DependencySettings::default()
            },
            ..PluginSettings::with_install_dir(temp.path().join("plugins"))
        };

        let fetcher = DirFetcher {
            repos: HashMap::from([
                ("https://github.com/acme/widget-plugin".to_string(), widget),
                ("https://github.com/acme/bundle".to_string(), bundle),
            ]),
        };

        let installer = PluginInstaller::new(settings)
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        Fixture { temp, installer }
    }

    #[tokio::test]
    async fn test_install_root_is_created() {
        let fx = fixture();
        assert!(fx.installer.install_root().is_dir());
        assert!(fx.installer.list_installed().is_empty());
    }

    #[tokio::test]
    async fn test_install_from_source_strips_vcs() {
        let fx = fixture();
        let outcome = fx
            .installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        assert_eq!(outcome.name, "widget");
        assert_eq!(outcome.version, "2.0.0");
        assert!(outcome.dependencies.is_none());
        assert!(outcome.path.join("plugin.yaml").is_file());
        assert!(!outcome.path.join(".git").exists());
        assert_eq!(outcome.message(), "Installed plugin 'widget' (v2.0.0)");
    }

    #[tokio::test]
    async fn test_install_with_subpath() {
        let fx = fixture();
        let outcome = fx
            .installer
            .install_from_source("acme/bundle:weather", None)
            .await
            .unwrap();
        assert_eq!(outcome.name, "weather");

        let err = fx
            .installer
            .install_from_source("acme/bundle", Some("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_install_without_manifest_is_invalid() {
        let fx = fixture();
        // 루트에는 plugin.yaml이 없음
        let err = fx
            .installer
            .install_from_source("acme/bundle", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));
        assert!(fx.installer.list_installed().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let fx = fixture();
        let err = fx
            .installer
            .install_from_source("acme/unknown", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_already_installed_leaves_existing_untouched() {
        let fx = fixture();
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        let installed = fx.installer.install_root().join("widget");
        std::fs::write(installed.join("payload.bin"), b"local edits").unwrap();

        let err = fx
            .installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyInstalled(ref n) if n == "widget"));
        assert_eq!(std::fs::read(installed.join("payload.bin")).unwrap(), b"local edits");
    }

    #[tokio::test]
    async fn test_install_from_local_path_and_list() {
        let fx = fixture();
        let local = fx.temp.path().join("local-clock");
        write_plugin(&local, "name: clock\nversion: 0.3.0\nauthor: me\n");
        std::fs::create_dir_all(fx.installer.install_root().join(".hidden")).unwrap();
        std::fs::create_dir_all(fx.installer.install_root().join("no-manifest")).unwrap();

        fx.installer.install_from_local_path(&local).await.unwrap();
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        let listed = fx.installer.list_installed();
        let names: Vec<&str> = listed.iter().map(|p| p.directory.as_str()).collect();
        assert_eq!(names, vec!["clock", "widget"]);
        assert_eq!(listed[0].manifest.author.as_deref(), Some("me"));

        let err = fx
            .installer
            .install_from_local_path(&fx.temp.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_follows_directory_symlinks() {
        let fx = fixture();
        let local = fx.temp.path().join("linky-src");
        write_plugin(&local, "name: linky\nversion: 1.0.0\n");
        std::fs::create_dir_all(local.join("assets")).unwrap();
        std::fs::write(local.join("assets").join("sun.png"), b"png").unwrap();
        std::os::unix::fs::symlink(local.join("assets"), local.join("icons")).unwrap();

        let outcome = fx.installer.install_from_local_path(&local).await.unwrap();

        let icons = outcome.path.join("icons");
        assert!(icons.is_dir());
        assert!(!std::fs::symlink_metadata(&icons).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(icons.join("sun.png")).unwrap(), b"png");
        assert!(outcome.path.join("assets").join("sun.png").is_file());
    }

    #[tokio::test]
    async fn test_uninstall() {
        let fx = fixture();
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        fx.installer.uninstall("widget").await.unwrap();
        assert!(!fx.installer.install_root().join("widget").exists());
        assert!(fx.installer.get_manifest("widget").is_none());

        assert!(matches!(
            fx.installer.uninstall("widget").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            fx.installer.uninstall("../plugins").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_busy_name_is_rejected() {
        let fx = fixture();
        let guard = fx.installer.begin("widget").unwrap();

        let err = fx
            .installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Busy(ref n) if n == "widget"));
        assert!(matches!(
            fx.installer.uninstall("widget").await.unwrap_err(),
            Error::Busy(_)
        ));

        drop(guard);
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dependency_failure_is_a_warning() {
        let fx = fixture();
        let local = fx.temp.path().join("needs-deps");
        write_plugin(&local, "name: needy\nversion: 1.0.0\n");
        std::fs::write(local.join("requirements.txt"), "requests\n").unwrap();

        let outcome = fx.installer.install_from_local_path(&local).await.unwrap();
        assert!(outcome.path.is_dir());
        let warning = outcome.warning().unwrap();
        assert!(warning.contains("manually"));
        assert!(outcome.message().contains("\nWarning: "));
    }

    #[tokio::test]
    async fn test_replace_swaps_and_cleans_staging() {
        let fx = fixture();
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        let newer = fx.temp.path().join("widget-v3");
        write_plugin(&newer, "name: widget\nversion: 3.0.0\n");
        std::fs::write(newer.join("payload.bin"), b"v3").unwrap();

        let source = PluginSource::parse(newer.to_str().unwrap()).unwrap();
        let outcome = fx.installer.replace_from_source("widget", &source).await.unwrap();
        assert_eq!(outcome.version, "3.0.0");

        let installed = fx.installer.install_root().join("widget");
        assert_eq!(std::fs::read(installed.join("payload.bin")).unwrap(), b"v3");
        assert!(!fx.installer.install_root().join(STAGING_DIR).exists());
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_version() {
        let fx = fixture();
        fx.installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();

        // 이름이 다른 플러그인
        let wrong = fx.temp.path().join("impostor");
        write_plugin(&wrong, "name: impostor\nversion: 9.0.0\n");
        let source = PluginSource::parse(wrong.to_str().unwrap()).unwrap();
        let err = fx
            .installer
            .replace_from_source("widget", &source)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));

        // 가져오기 실패
        let source = PluginSource::parse("acme/unknown").unwrap();
        assert!(fx.installer.replace_from_source("widget", &source).await.is_err());

        let manifest = fx.installer.get_manifest("widget").unwrap();
        assert_eq!(manifest.version.as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn test_check_for_updates_with_nothing_installed() {
        let fx = fixture();
        // 네트워크 접근 없이 빈 목록
        let updates = fx.installer.check_for_updates(Some("acme/none")).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_installed_events() {
        let fx = fixture();
        let events = EventBus::new();
        let installer = fx.installer.with_events(events.clone());

        installer
            .install_from_source("acme/widget-plugin", None)
            .await
            .unwrap();
        installer.uninstall("widget").await.unwrap();

        let names: Vec<String> = events.history(None).into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![event_names::PLUGIN_UNINSTALLED, event_names::PLUGIN_INSTALLED]
        );
    }
}
