//! tickr-core: Plugin runtime for Tickr
//!
//! Layer2 - 플러그인 서브시스템
//!
//! # 주요 모듈
//!
//! - `plugin::version`: 버전 비교
//! - `plugin::traits` / `plugin::context`: 플러그인 계약
//! - `plugin::loader` / `plugin::native`: 탐색 및 동적 로딩
//! - `plugin::manager`: 라이프사이클 (load/unload/enable/disable)
//! - `plugin::installer`: 원격/로컬 설치, 제거, 업데이트 확인
//! - `plugin::update`: 업데이트 적용 (스테이징 교체)
//! - `plugin::jobs`: 네트워크 작업 백그라운드 실행
//!
//! # 사용 예시
//!
//! ```ignore
//! use std::sync::Arc;
//! use tickr_core::{PluginInstaller, PluginManager};
//! use tickr_foundation::{ConfigStore, EventBus, PluginSettings};
//!
//! let config = Arc::new(ConfigStore::load_global()?);
//! let settings = PluginSettings::from_config(config.as_ref());
//! let events = EventBus::new();
//!
//! let mut plugins = PluginManager::from_settings(&settings, config, events.clone());
//! plugins.restore_enabled();
//!
//! let installer = PluginInstaller::new(settings)?.with_events(events);
//! installer.install_from_source("acme/tickr-plugins:weather", None).await?;
//! plugins.load("weather")?;
//! ```

pub mod plugin;

// Re-exports: Contract
pub use plugin::{HookError, HookResult, Plugin, PluginContext, PluginInfo, WidgetHandle};

// Re-exports: Loading / Lifecycle
pub use plugin::{
    BindError, ModuleOpener, NativeOpener, PluginDeclaration, PluginFactory, PluginLoader,
    PluginManager, PluginOrigin, PluginSummary,
};

// Re-exports: Installation / Update
pub use plugin::{
    CatalogClient, InstallOutcome, InstalledPlugin, Job, JobOutput, JobResult, JobRunner,
    PluginInstaller, PluginManifest, PluginSource, PluginUpdater, RemoteCatalogEntry,
    UpdateCandidate, UpdateOutcome,
};

// Re-exports: Version
pub use plugin::{compare_versions, is_newer, VersionOrdering};
