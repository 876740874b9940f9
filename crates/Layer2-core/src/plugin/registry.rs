//! Plugin Registry - 활성 플러그인 인스턴스 저장소

use super::context::PluginContext;
use super::loader::BoundPlugin;
use super::traits::{Plugin, PluginInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// 활성 플러그인 인스턴스
///
/// 필드 선언 순서대로 해제되므로 플러그인 객체가 라이브러리보다 먼저
/// 해제됩니다.
pub struct PluginInstance {
    /// 플러그인 객체
    plugin: Box<dyn Plugin>,

    /// 결정된 식별 정보
    info: PluginInfo,

    /// 활성화 여부
    enabled: bool,

    /// 로드 순서
    load_order: usize,

    /// 플러그인 컨텍스트
    context: PluginContext,

    /// 바인딩 (라이브러리 보관)
    binding: Arc<BoundPlugin>,
}

impl PluginInstance {
    pub(crate) fn new(
        plugin: Box<dyn Plugin>,
        info: PluginInfo,
        context: PluginContext,
        binding: Arc<BoundPlugin>,
    ) -> Self {
        Self {
            plugin,
            info,
            enabled: false,
            load_order: 0,
            context,
            binding,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn load_order(&self) -> usize {
        self.load_order
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn binding(&self) -> &Arc<BoundPlugin> {
        &self.binding
    }

    pub(crate) fn plugin_mut(&mut self) -> &mut dyn Plugin {
        self.plugin.as_mut()
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("info", &self.info)
            .field("enabled", &self.enabled)
            .field("load_order", &self.load_order)
            .finish()
    }
}

/// 플러그인 레지스트리 - 이름당 최대 하나의 활성 인스턴스
#[derive(Debug, Default)]
pub struct PluginRegistry {
    /// 활성 인스턴스 (이름 -> 인스턴스)
    instances: HashMap<String, PluginInstance>,

    /// 로드 카운터
    load_counter: usize,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 인스턴스 등록
    ///
    /// 같은 이름이 이미 있으면 `false`이며 인스턴스는 버려집니다.
    pub fn register(&mut self, mut instance: PluginInstance) -> bool {
        let name = instance.name().to_string();
        if self.instances.contains_key(&name) {
            warn!("Plugin {} is already registered", name);
            return false;
        }

        self.load_counter += 1;
        instance.load_order = self.load_counter;

        info!("Registered plugin: {} (v{})", name, instance.info.version);
        self.instances.insert(name, instance);
        true
    }

    /// 등록 해제
    pub fn unregister(&mut self, name: &str) -> Option<PluginInstance> {
        let removed = self.instances.remove(name);
        if removed.is_some() {
            info!("Unregistered plugin: {}", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.instances.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginInstance> {
        self.instances.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// 활성 이름 (로드 순서대로)
    pub fn names(&self) -> Vec<String> {
        self.ordered(|_| true)
    }

    /// 활성화된 이름 (로드 순서대로)
    pub fn enabled_names(&self) -> Vec<String> {
        self.ordered(PluginInstance::is_enabled)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn ordered(&self, filter: impl Fn(&PluginInstance) -> bool) -> Vec<String> {
        let mut selected: Vec<&PluginInstance> =
            self.instances.values().filter(|i| filter(i)).collect();
        selected.sort_by_key(|i| i.load_order);
        selected.iter().map(|i| i.name().to_string()).collect()
    }
}
