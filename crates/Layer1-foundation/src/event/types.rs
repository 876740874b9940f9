//! Event Types - 이벤트 타입 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 애플리케이션 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEvent {
    /// 이벤트 이름 (예: "plugin.enabled")
    pub name: String,

    /// 이벤트 데이터
    pub data: Value,

    /// 발생 위치
    pub source: String,

    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl AppEvent {
    /// 새 이벤트 생성
    pub fn new(name: impl Into<String>, data: Value, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }

    /// 이벤트 데이터의 "plugin" 필드
    pub fn plugin(&self) -> Option<&str> {
        self.data.get("plugin").and_then(Value::as_str)
    }
}

/// 사전 정의된 이벤트 이름
pub mod names {
    pub const PLUGIN_LOADED: &str = "plugin.loaded";
    pub const PLUGIN_UNLOADED: &str = "plugin.unloaded";
    pub const PLUGIN_ENABLED: &str = "plugin.enabled";
    pub const PLUGIN_DISABLED: &str = "plugin.disabled";
    pub const PLUGIN_INSTALLED: &str = "plugin.installed";
    pub const PLUGIN_UNINSTALLED: &str = "plugin.uninstalled";
    pub const PLUGIN_UPDATED: &str = "plugin.updated";
}
