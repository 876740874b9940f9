//! Plugin Context - 플러그인이 호스트와 상호작용하는 인터페이스
//!
//! 설정은 `plugins.configs.<name>.<key>` 아래에 저장되므로 두 플러그인의
//! 키가 충돌할 수 없습니다.

use serde_json::{Map, Value};
use std::sync::Arc;
use tickr_foundation::{ConfigAccess, EventBus, Result};

/// 플러그인별 설정이 저장되는 위치
pub const PLUGIN_CONFIGS_KEY: &str = "plugins.configs";

/// 플러그인 컨텍스트
#[derive(Clone)]
pub struct PluginContext {
    /// 플러그인 이름 (설정 네임스페이스)
    name: String,

    /// 호스트 설정
    config: Arc<dyn ConfigAccess>,

    /// 이벤트 버스
    events: EventBus,
}

impl PluginContext {
    pub fn new(name: impl Into<String>, config: Arc<dyn ConfigAccess>, events: EventBus) -> Self {
        Self {
            name: name.into(),
            config,
            events,
        }
    }

    /// 플러그인 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 이벤트 버스 접근
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// 설정 값 가져오기 (없으면 `default`)
    pub fn get_config(&self, key: &str, default: Value) -> Value {
        self.config
            .get(PLUGIN_CONFIGS_KEY)
            .and_then(|configs| configs.get(&self.name).and_then(|c| c.get(key)).cloned())
            .unwrap_or(default)
    }

    /// 설정 값 저장 (즉시 파일에 기록)
    pub fn set_config(&self, key: &str, value: Value) -> Result<()> {
        let mut configs = match self.config.get(PLUGIN_CONFIGS_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let mut own = match configs.remove(&self.name) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        own.insert(key.to_string(), value);
        configs.insert(self.name.clone(), Value::Object(own));

        self.config.set(PLUGIN_CONFIGS_KEY, Value::Object(configs));
        self.config.save()
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
