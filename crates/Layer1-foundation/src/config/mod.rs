//! Config - 통합 설정 관리
//!
//! - `store.rs` - 점(.) 경로 기반 설정 저장소 (`ConfigAccess`, `ConfigStore`)
//! - `plugins.rs` - 플러그인 서브시스템 설정 (`PluginSettings`)

mod plugins;
mod store;

pub use plugins::{DependencySettings, PluginSettings, PLUGIN_SETTINGS_KEY};
pub use store::{default_config, ConfigAccess, ConfigStore, TICKR_CONFIG_FILE};
