//! # tickr-foundation
//!
//! Foundation layer for Tickr:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Config: 점(.) 경로 설정 저장소 + 플러그인 설정
//! - Storage: JsonStore (범용 JSON 파일)
//! - Event: 라이프사이클 이벤트 버스
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  tickr-cli (Layer3)                                      │
//! │          │                                               │
//! │          ▼                                               │
//! │  tickr-core (Layer2) - Plugin Loader/Manager/Installer   │
//! │          │                                               │
//! │          ▼                                               │
//! │  tickr-foundation (Layer1)                               │
//! │   ├── ConfigAccess / ConfigStore                         │
//! │   ├── EventBus                                           │
//! │   └── Error                                              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    default_config, ConfigAccess, ConfigStore, DependencySettings, PluginSettings,
    PLUGIN_SETTINGS_KEY, TICKR_CONFIG_FILE,
};

// ============================================================================
// Event / Storage
// ============================================================================
pub use event::{names as event_names, AppEvent, EventBus, EventBusConfig};
pub use storage::JsonStore;
