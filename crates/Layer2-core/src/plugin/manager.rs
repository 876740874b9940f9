//! Plugin Manager - 플러그인 라이프사이클 관리
//!
//! 라이프사이클: discovered → bound → initialized → enabled ⇄ disabled → unloaded
//!
//! 훅 실패는 [`invoke_hook`]에서 로그로 남고 진행 중인 작업을 중단시키지
//! 않습니다. `unload`는 항상 인스턴스를 제거합니다.

use super::context::PluginContext;
use super::loader::PluginLoader;
use super::registry::{PluginInstance, PluginRegistry};
use super::traits::{invoke_hook, invoke_initialize, HookError, PluginInfo, WidgetHandle};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tickr_foundation::{event_names, ConfigAccess, Error, EventBus, PluginSettings, Result};
use tracing::{debug, error, info, warn};

/// 활성화된 플러그인 목록 설정 키
pub const ENABLED_PLUGINS_KEY: &str = "plugins.enabled";

/// 플러그인 매니저 - 전체 플러그인 시스템 관리
pub struct PluginManager {
    /// 플러그인 로더
    loader: PluginLoader,

    /// 활성 인스턴스
    registry: PluginRegistry,

    /// 호스트 설정
    config: Arc<dyn ConfigAccess>,

    /// 이벤트 버스
    events: EventBus,

    /// 의존 라이브러리 검색 위치
    dependency_dirs: Vec<PathBuf>,
}

impl PluginManager {
    /// 새 매니저 생성
    pub fn new(loader: PluginLoader, config: Arc<dyn ConfigAccess>, events: EventBus) -> Self {
        Self {
            loader,
            registry: PluginRegistry::new(),
            config,
            events,
            dependency_dirs: Vec::new(),
        }
    }

    /// 플러그인 설정으로 생성 (내장 플러그인 + 네이티브 로더)
    pub fn from_settings(
        settings: &PluginSettings,
        config: Arc<dyn ConfigAccess>,
        events: EventBus,
    ) -> Self {
        Self::new(PluginLoader::new(settings.plugin_dirs()), config, events)
            .with_dependency_dirs(settings.library_dirs.clone())
    }

    /// 빌더 패턴: 의존 라이브러리 검색 위치
    pub fn with_dependency_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.dependency_dirs = dirs;
        self
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // 플러그인 로드/언로드
    // ========================================================================

    /// 사용 가능한 플러그인
    pub fn discover(&self) -> BTreeSet<String> {
        self.loader.discover()
    }

    /// 플러그인 로드 및 초기화
    ///
    /// 이미 활성 상태면 아무것도 하지 않고 성공합니다.
    pub fn load(&mut self, name: &str) -> Result<()> {
        if self.registry.contains(name) {
            debug!("Plugin {} is already active", name);
            return Ok(());
        }

        let binding = self.loader.bind(name, &self.dependency_dirs)?;

        let created = invoke_hook(name, "create", || {
            let plugin = binding.instantiate();
            let declared = plugin.info();
            Ok((plugin, declared))
        });
        let (mut plugin, declared) = match created {
            Ok(created) => created,
            Err(e) => {
                self.loader.unbind(name);
                return Err(Error::PluginLoad(format!("{}: {}", name, e)));
            }
        };

        let info = binding.identity(declared);
        info!("Loading plugin: {} (v{})", info.name, info.version);

        let ctx = PluginContext::new(name, Arc::clone(&self.config), self.events.clone());
        if !invoke_initialize(plugin.as_mut(), name, &ctx) {
            error!("Plugin {} failed to initialize", name);
            drop(plugin);
            self.loader.unbind(name);
            return Err(Error::InitializationFailed(name.to_string()));
        }

        let mut instance = PluginInstance::new(plugin, info, ctx, binding);
        instance.set_enabled(true);
        let _ = invoke_hook(name, "on_enable", || instance.plugin_mut().on_enable());
        self.registry.register(instance);

        self.emit(event_names::PLUGIN_LOADED, name);
        self.emit(event_names::PLUGIN_ENABLED, name);
        Ok(())
    }

    /// 플러그인 언로드
    ///
    /// 활성 상태가 아니면 `false`. 훅 실패와 관계없이 항상 제거됩니다.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(mut instance) = self.registry.unregister(name) else {
            return false;
        };

        let _ = invoke_hook(name, "on_disable", || instance.plugin_mut().on_disable());
        instance.set_enabled(false);
        let _ = invoke_hook(name, "shutdown", || instance.plugin_mut().shutdown());

        drop(instance);
        self.loader.unbind(name);

        info!("Unloaded plugin: {}", name);
        self.emit(event_names::PLUGIN_UNLOADED, name);
        true
    }

    /// 플러그인 재로드 (디스크에서 다시 읽음)
    pub fn reload(&mut self, name: &str) -> Result<()> {
        self.unload(name);
        self.load(name)
    }

    /// 플러그인 활성화 (비활성 상태면 로드)
    pub fn enable(&mut self, name: &str) -> Result<()> {
        let Some(instance) = self.registry.get_mut(name) else {
            return self.load(name);
        };

        if !instance.is_enabled() {
            instance.set_enabled(true);
            let _ = invoke_hook(name, "on_enable", || instance.plugin_mut().on_enable());
            self.emit(event_names::PLUGIN_ENABLED, name);
        }
        Ok(())
    }

    /// 플러그인 비활성화 (언로드하지 않음)
    ///
    /// 활성 상태가 아니면 `false`.
    pub fn disable(&mut self, name: &str) -> bool {
        let Some(instance) = self.registry.get_mut(name) else {
            return false;
        };

        if instance.is_enabled() {
            let _ = invoke_hook(name, "on_disable", || instance.plugin_mut().on_disable());
            instance.set_enabled(false);
            self.emit(event_names::PLUGIN_DISABLED, name);
        }
        true
    }

    /// 모든 플러그인 종료 (역순, 개별 실패와 무관하게 계속)
    pub fn shutdown_all(&mut self) {
        let mut names = self.registry.names();
        names.reverse();
        for name in names {
            if !self.unload(&name) {
                warn!("Plugin {} vanished during shutdown", name);
            }
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 활성 플러그인 (로드 순서)
    pub fn list_active(&self) -> Vec<String> {
        self.registry.names()
    }

    /// 활성화된 플러그인 (로드 순서)
    pub fn list_enabled(&self) -> Vec<String> {
        self.registry.enabled_names()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.registry.get(name).is_some_and(PluginInstance::is_enabled)
    }

    /// 활성 인스턴스
    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.registry.get(name)
    }

    /// 활성 인스턴스의 식별 정보
    pub fn info(&self, name: &str) -> Option<PluginInfo> {
        self.registry.get(name).map(|i| i.info().clone())
    }

    /// 위젯 생성 (호스트 경계)
    ///
    /// 실패는 로그로 남기고 `None`을 반환합니다.
    pub fn create_widget(&mut self, name: &str, parent: WidgetHandle) -> Option<WidgetHandle> {
        let instance = self.registry.get_mut(name)?;
        if !instance.is_enabled() {
            return None;
        }
        invoke_hook(name, "create_widget", || instance.plugin_mut().create_widget(parent))
            .unwrap_or_else(|_: HookError| None)
    }

    pub fn summary(&self) -> PluginSummary {
        let total = self.registry.len();
        let enabled = self.registry.enabled_names().len();
        PluginSummary {
            total,
            enabled,
            disabled: total - enabled,
        }
    }

    // ========================================================================
    // 영속화
    // ========================================================================

    /// 설정에 저장된 플러그인 로드
    ///
    /// 실패한 플러그인과 에러 목록을 반환합니다.
    pub fn restore_enabled(&mut self) -> Vec<(String, Error)> {
        let names: Vec<String> = match self.config.get(ENABLED_PLUGINS_KEY) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let mut failures = Vec::new();
        for name in names {
            if let Err(e) = self.load(&name) {
                warn!("Failed to restore plugin {}: {}", name, e);
                failures.push((name, e));
            }
        }
        failures
    }

    /// 활성화된 플러그인 목록을 설정에 저장
    pub fn persist_enabled(&self) -> Result<()> {
        self.config
            .set(ENABLED_PLUGINS_KEY, json!(self.list_enabled()));
        self.config.save()
    }

    fn emit(&self, event: &str, name: &str) {
        self.events.emit(event, json!({ "plugin": name }));
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            debug!("Dropping manager with {} active plugin(s)", self.registry.len());
            self.shutdown_all();
        }
    }
}

/// 플러그인 시스템 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::native::ModuleOpener;
    use crate::plugin::traits::{HookResult, Plugin};
    use crate::plugin::NativeOpener;
    use parking_lot::Mutex;
    use tickr_foundation::ConfigStore;

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy, Default)]
    struct Behaviour {
        init_ok: bool,
        panic_on_init: bool,
        fail_hooks: bool,
        panic_on_widget: bool,
    }

    struct Probe {
        name: &'static str,
        journal: Journal,
        behaviour: Behaviour,
    }

    impl Probe {
        fn record(&self, event: &str) {
            self.journal.lock().push(format!("{}:{}", self.name, event));
        }

        fn hook(&self, event: &str) -> HookResult {
            self.record(event);
            if self.behaviour.fail_hooks {
                Err(HookError::failed(format!("{} refused", event)))
            } else {
                Ok(())
            }
        }
    }

    impl Plugin for Probe {
        fn info(&self) -> PluginInfo {
            PluginInfo::new(self.name, "1.0.0").with_description("probe")
        }

        fn initialize(&mut self, ctx: &PluginContext) -> bool {
            self.record("initialize");
            assert_eq!(ctx.name(), self.name);
            if self.behaviour.panic_on_init {
                panic!("init exploded");
            }
            self.behaviour.init_ok
        }

        fn shutdown(&mut self) -> HookResult {
            self.hook("shutdown")
        }

        fn create_widget(&mut self, parent: WidgetHandle) -> std::result::Result<Option<WidgetHandle>, HookError> {
            if self.behaviour.panic_on_widget {
                panic!("widget exploded");
            }
            Ok(Some(WidgetHandle(parent.0 + 1)))
        }

        fn on_enable(&mut self) -> HookResult {
            self.hook("on_enable")
        }

        fn on_disable(&mut self) -> HookResult {
            self.hook("on_disable")
        }
    }

    fn loader_with(journal: &Journal, plugins: &[(&'static str, Behaviour)]) -> PluginLoader {
        let opener: Arc<dyn ModuleOpener> = Arc::new(NativeOpener);
        let mut loader = PluginLoader::with_opener(Vec::new(), opener);
        for (name, behaviour) in plugins {
            let (name, behaviour, journal) = (*name, *behaviour, Arc::clone(journal));
            loader.register_builtin(
                name,
                Arc::new(move || {
                    Box::new(Probe {
                        name,
                        journal: Arc::clone(&journal),
                        behaviour,
                    }) as Box<dyn Plugin>
                }),
            );
        }
        loader
    }

    fn ok() -> Behaviour {
        Behaviour {
            init_ok: true,
            ..Behaviour::default()
        }
    }

    fn manager(plugins: &[(&'static str, Behaviour)]) -> (PluginManager, Journal, Arc<ConfigStore>) {
        let journal: Journal = Arc::default();
        let config = Arc::new(ConfigStore::in_memory());
        let manager = PluginManager::new(
            loader_with(&journal, plugins),
            config.clone(),
            EventBus::new(),
        );
        (manager, journal, config)
    }

    fn count(journal: &Journal, entry: &str) -> usize {
        journal.lock().iter().filter(|e| *e == entry).count()
    }

    #[test]
    fn test_load_twice_initializes_once() {
        let (mut manager, journal, _) = manager(&[("alpha", ok())]);

        manager.load("alpha").unwrap();
        manager.load("alpha").unwrap();

        assert_eq!(manager.list_active(), vec!["alpha"]);
        assert_eq!(count(&journal, "alpha:initialize"), 1);
        assert_eq!(count(&journal, "alpha:on_enable"), 1);
        assert!(manager.is_enabled("alpha"));
    }

    #[test]
    fn test_failed_initialize_is_not_registered() {
        let (mut manager, journal, _) = manager(&[("broken", Behaviour::default())]);

        let err = manager.load("broken").unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(ref n) if n == "broken"));
        assert!(manager.list_active().is_empty());
        assert_eq!(count(&journal, "broken:on_enable"), 0);

        // 등록되지 않았으므로 unload는 false
        assert!(!manager.unload("broken"));
        assert_eq!(count(&journal, "broken:shutdown"), 0);
    }

    #[test]
    fn test_panicking_initialize_is_a_failure() {
        let behaviour = Behaviour {
            panic_on_init: true,
            ..ok()
        };
        let (mut manager, _, _) = manager(&[("wild", behaviour)]);

        assert!(matches!(
            manager.load("wild").unwrap_err(),
            Error::InitializationFailed(_)
        ));
        assert!(!manager.is_active("wild"));
    }

    #[test]
    fn test_unknown_plugin() {
        let (mut manager, _, _) = manager(&[]);
        assert!(matches!(manager.load("ghost").unwrap_err(), Error::NotFound(_)));
        assert!(!manager.unload("ghost"));
        assert!(!manager.disable("ghost"));
    }

    #[test]
    fn test_unload_completes_despite_hook_failures() {
        let behaviour = Behaviour {
            fail_hooks: true,
            ..ok()
        };
        let (mut manager, journal, _) = manager(&[("grumpy", behaviour)]);

        manager.load("grumpy").unwrap();
        assert!(manager.is_enabled("grumpy"));

        assert!(manager.unload("grumpy"));
        assert!(manager.list_active().is_empty());
        assert_eq!(
            journal.lock().as_slice(),
            &[
                "grumpy:initialize",
                "grumpy:on_enable",
                "grumpy:on_disable",
                "grumpy:shutdown"
            ]
        );
        assert!(manager.loader().cached().is_empty());
    }

    #[test]
    fn test_enable_disable_toggle() {
        let (mut manager, journal, _) = manager(&[("alpha", ok()), ("beta", ok())]);
        manager.load("alpha").unwrap();
        manager.load("beta").unwrap();

        assert!(manager.disable("alpha"));
        assert!(manager.disable("alpha"));
        assert_eq!(count(&journal, "alpha:on_disable"), 1);
        assert_eq!(manager.list_active(), vec!["alpha", "beta"]);
        assert_eq!(manager.list_enabled(), vec!["beta"]);

        manager.enable("alpha").unwrap();
        assert_eq!(count(&journal, "alpha:on_enable"), 2);
        assert_eq!(manager.list_enabled(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_enable_inactive_delegates_to_load() {
        let (mut manager, journal, _) = manager(&[("alpha", ok())]);
        manager.enable("alpha").unwrap();
        assert!(manager.is_active("alpha"));
        assert_eq!(count(&journal, "alpha:initialize"), 1);
    }

    #[test]
    fn test_shutdown_all_drains_in_reverse() {
        let failing = Behaviour {
            fail_hooks: true,
            ..ok()
        };
        let (mut manager, journal, _) = manager(&[("a", ok()), ("b", failing), ("c", ok())]);
        for name in ["a", "b", "c"] {
            manager.load(name).unwrap();
        }

        manager.shutdown_all();
        assert!(manager.list_active().is_empty());

        let shutdowns: Vec<String> = journal
            .lock()
            .iter()
            .filter(|e| e.ends_with(":shutdown"))
            .cloned()
            .collect();
        assert_eq!(shutdowns, vec!["c:shutdown", "b:shutdown", "a:shutdown"]);
    }

    #[test]
    fn test_create_widget_contains_panics() {
        let wild = Behaviour {
            panic_on_widget: true,
            ..ok()
        };
        let (mut manager, _, _) = manager(&[("calm", ok()), ("wild", wild)]);
        manager.load("calm").unwrap();
        manager.load("wild").unwrap();

        assert_eq!(manager.create_widget("calm", WidgetHandle(1)), Some(WidgetHandle(2)));
        assert_eq!(manager.create_widget("wild", WidgetHandle(1)), None);
        assert_eq!(manager.create_widget("ghost", WidgetHandle(1)), None);
        assert!(manager.is_active("wild"));
    }

    #[test]
    fn test_persist_and_restore_enabled() {
        let (mut manager, _, config) = manager(&[("alpha", ok()), ("beta", ok())]);
        manager.load("alpha").unwrap();
        manager.load("beta").unwrap();
        manager.disable("beta");
        manager.persist_enabled().unwrap();
        assert_eq!(config.get(ENABLED_PLUGINS_KEY), Some(json!(["alpha"])));

        config.set(ENABLED_PLUGINS_KEY, json!(["alpha", "ghost"]));
        let journal: Journal = Arc::default();
        let mut fresh = PluginManager::new(
            loader_with(&journal, &[("alpha", ok())]),
            config.clone(),
            EventBus::new(),
        );
        let failures = fresh.restore_enabled();
        assert_eq!(fresh.list_active(), vec!["alpha"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "ghost");
    }

    #[test]
    fn test_lifecycle_events() {
        let (mut manager, _, _) = manager(&[("alpha", ok())]);
        let mut rx = manager.events().subscribe();

        manager.load("alpha").unwrap();
        manager.disable("alpha");
        manager.unload("alpha");

        let names: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec![
                event_names::PLUGIN_LOADED,
                event_names::PLUGIN_ENABLED,
                event_names::PLUGIN_DISABLED,
                event_names::PLUGIN_UNLOADED
            ]
        );
    }

    #[test]
    fn test_summary() {
        let (mut manager, _, _) = manager(&[("alpha", ok()), ("beta", ok())]);
        manager.load("alpha").unwrap();
        manager.load("beta").unwrap();
        manager.disable("beta");
        assert_eq!(
            manager.summary(),
            PluginSummary {
                total: 2,
                enabled: 1,
                disabled: 1
            }
        );
    }
}
