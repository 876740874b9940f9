//! Plugin Update - 업데이트 확인 및 적용
//!
//! 업데이트 흐름:
//!
//! 1. 활성화 여부 기록
//! 2. 활성 상태면 언로드 (캐시된 모듈 해제)
//! 3. 새 버전을 스테이징 후 교체 ([`PluginInstaller::replace_from_source`])
//! 4. 이전에 활성화되어 있었다면 다시 로드
//!
//! 3단계가 실패하면 이전 디렉토리가 복원되므로, 4단계는 이전 버전을 다시 로드합니다.

use super::catalog::entry_source;
use super::installer::{InstallOutcome, PluginInstaller};
use super::manager::PluginManager;
use super::source::PluginSource;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tickr_foundation::{event_names, Error, Result};
use tracing::{info, warn};

/// 업데이트 후보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCandidate {
    pub name: String,
    pub current_version: String,
    pub latest_version: String,
    pub description: String,
    pub repository: String,
    /// 저장소 내 하위 디렉토리
    pub path: String,
}

impl UpdateCandidate {
    /// 새 버전의 설치 소스
    pub fn source(&self) -> Result<PluginSource> {
        entry_source(&self.name, &self.repository, &self.path)
    }
}

/// 적용된 업데이트
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub install: InstallOutcome,
    pub previous_version: String,
    /// 업데이트 전 활성화 여부
    pub was_enabled: bool,
    /// 재로드 실패 메시지 (설치는 성공)
    pub reload_error: Option<String>,
}

impl UpdateOutcome {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Updated plugin '{}' from v{} to v{}",
            self.install.name, self.previous_version, self.install.version
        );
        if let Some(warning) = self.install.warning() {
            message.push_str("\nWarning: ");
            message.push_str(warning);
        }
        if let Some(e) = &self.reload_error {
            message.push_str("\nWarning: could not reload: ");
            message.push_str(e);
        }
        message
    }
}

/// 플러그인 업데이트 적용기
#[derive(Clone)]
pub struct PluginUpdater {
    installer: Arc<PluginInstaller>,
}

impl PluginUpdater {
    pub fn new(installer: Arc<PluginInstaller>) -> Self {
        Self { installer }
    }

    pub fn installer(&self) -> &PluginInstaller {
        &self.installer
    }

    /// 업데이트 확인
    pub async fn check(&self, repo_ref: Option<&str>) -> Result<Vec<UpdateCandidate>> {
        self.installer.check_for_updates(repo_ref).await
    }

    /// 후보 하나 적용
    pub async fn apply(
        &self,
        manager: &mut PluginManager,
        candidate: &UpdateCandidate,
    ) -> Result<UpdateOutcome> {
        let name = candidate.name.as_str();
        let source = candidate.source()?;
        let was_enabled = manager.is_enabled(name);

        info!(
            "Updating {} from v{} to v{}",
            name, candidate.current_version, candidate.latest_version
        );

        if manager.is_active(name) {
            manager.unload(name);
        }

        let replaced = self.installer.replace_from_source(name, &source).await;
        manager.loader().unbind(name);

        let install = match replaced {
            Ok(install) => install,
            Err(e) => {
                warn!("Update of {} failed, keeping the installed version: {}", name, e);
                if was_enabled {
                    if let Err(reload) = manager.load(name) {
                        warn!("Failed to reload previous {}: {}", name, reload);
                    }
                }
                return Err(e);
            }
        };

        let reload_error = if was_enabled {
            manager.load(name).err().map(|e| e.to_string())
        } else {
            None
        };

        manager.events().emit(
            event_names::PLUGIN_UPDATED,
            json!({
                "plugin": name,
                "from": candidate.current_version,
                "to": install.version,
            }),
        );

        Ok(UpdateOutcome {
            install,
            previous_version: candidate.current_version.clone(),
            was_enabled,
            reload_error,
        })
    }

    /// 모든 후보 적용 (실패해도 계속 진행)
    pub async fn apply_all(
        &self,
        manager: &mut PluginManager,
        candidates: &[UpdateCandidate],
    ) -> Vec<(String, Result<UpdateOutcome>)> {
        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let result = self.apply(manager, candidate).await;
            reports.push((candidate.name.clone(), result));
        }
        reports
    }

    /// 이름으로 업데이트 (업데이트가 없으면 NotFound)
    pub async fn update_by_name(
        &self,
        manager: &mut PluginManager,
        name: &str,
        repo_ref: Option<&str>,
    ) -> Result<UpdateOutcome> {
        let candidate = self
            .check(repo_ref)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::NotFound(format!("No update available for '{}'", name)))?;
        self.apply(manager, &candidate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::loader::PluginLoader;
    use crate::plugin::native::{BindError, LoadedModule, ModuleOpener};
    use crate::plugin::traits::{Plugin, PluginInfo};
    use crate::plugin::PluginContext;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use tickr_foundation::{ConfigStore, EventBus, PluginSettings};

    struct Widget;

    impl Plugin for Widget {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("widget", "0.0.1")
        }

        fn initialize(&mut self, _ctx: &PluginContext) -> bool {
            true
        }
    }

    struct FakeOpener;

    impl ModuleOpener for FakeOpener {
        fn open(&self, _path: &Path, _deps: &[PathBuf]) -> std::result::Result<LoadedModule, BindError> {
            Ok(LoadedModule::from_factory(Arc::new(|| {
                Box::new(Widget) as Box<dyn Plugin>
            })))
        }
    }

    fn write_package(dir: &Path, name: &str, version: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("plugin.yaml"),
            format!("name: {}\nversion: {}\n", name, version),
        )
        .unwrap();
        std::fs::write(dir.join(libloading::library_filename(name)), b"").unwrap();
    }

    struct Fixture {
        temp: TempDir,
        updater: PluginUpdater,
        manager: PluginManager,
        events: EventBus,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("plugins");
        write_package(&root.join("widget"), "widget", "1.0.0");

        let installer = PluginInstaller::new(PluginSettings::with_install_dir(&root)).unwrap();
        let events = EventBus::new();
        let loader = PluginLoader::with_opener(vec![root], Arc::new(FakeOpener));
        let manager = PluginManager::new(loader, Arc::new(ConfigStore::in_memory()), events.clone());

        Fixture {
            temp,
            updater: PluginUpdater::new(Arc::new(installer)),
            manager,
            events,
        }
    }

    fn candidate(repository: &Path) -> UpdateCandidate {
        UpdateCandidate {
            name: "widget".into(),
            current_version: "1.0.0".into(),
            latest_version: "1.1.0".into(),
            description: String::new(),
            repository: repository.to_string_lossy().to_string(),
            path: String::new(),
        }
    }

    #[tokio::test]
    async fn test_apply_reloads_enabled_plugin() {
        let mut fx = fixture();
        fx.manager.load("widget").unwrap();
        assert_eq!(fx.manager.info("widget").unwrap().version, "1.0.0");

        let newer = fx.temp.path().join("widget-1.1.0");
        write_package(&newer, "widget", "1.1.0");

        let outcome = fx
            .updater
            .apply(&mut fx.manager, &candidate(&newer))
            .await
            .unwrap();

        assert!(outcome.was_enabled);
        assert!(outcome.reload_error.is_none());
        assert_eq!(outcome.message(), "Updated plugin 'widget' from v1.0.0 to v1.1.0");
        assert!(fx.manager.is_enabled("widget"));
        assert_eq!(fx.manager.info("widget").unwrap().version, "1.1.0");

        let latest = &fx.events.history(Some(1))[0];
        assert_eq!(latest.name, event_names::PLUGIN_UPDATED);
        assert_eq!(latest.data["to"], "1.1.0");
    }

    #[tokio::test]
    async fn test_apply_keeps_inactive_plugin_inactive() {
        let mut fx = fixture();
        let newer = fx.temp.path().join("widget-1.1.0");
        write_package(&newer, "widget", "1.1.0");

        let outcome = fx
            .updater
            .apply(&mut fx.manager, &candidate(&newer))
            .await
            .unwrap();

        assert!(!outcome.was_enabled);
        assert!(!fx.manager.is_active("widget"));
        let manifest = fx.updater.installer().get_manifest("widget").unwrap();
        assert_eq!(manifest.version.as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_failed_apply_restores_previous_version() {
        let mut fx = fixture();
        fx.manager.load("widget").unwrap();

        let wrong = fx.temp.path().join("gadget");
        write_package(&wrong, "gadget", "9.9.9");

        let err = fx
            .updater
            .apply(&mut fx.manager, &candidate(&wrong))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPlugin(_)));

        assert!(fx.manager.is_enabled("widget"));
        assert_eq!(fx.manager.info("widget").unwrap().version, "1.0.0");
        assert!(fx.updater.installer().get_manifest("widget").is_some());
    }

    #[tokio::test]
    async fn test_apply_all_continues_past_failures() {
        let mut fx = fixture();
        let newer = fx.temp.path().join("widget-1.1.0");
        write_package(&newer, "widget", "1.1.0");

        let missing = UpdateCandidate {
            name: "ghost".into(),
            ..candidate(&fx.temp.path().join("ghost"))
        };

        let reports = fx
            .updater
            .apply_all(&mut fx.manager, &[missing, candidate(&newer)])
            .await;

        assert_eq!(reports.len(), 2);
        assert!(reports[0].1.is_err());
        assert_eq!(reports[1].0, "widget");
        assert!(reports[1].1.is_ok());
    }
}
