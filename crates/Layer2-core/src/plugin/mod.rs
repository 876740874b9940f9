//! # Plugin System
//!
//! Tickr 플러그인 시스템: 탐색, 동적 로딩, 라이프사이클 관리, 원격 설치/업데이트
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PluginManager                           │
//! │  ┌───────────────────────────────────────────────────────┐ │
//! │  │                   PluginRegistry                       │ │
//! │  │  ┌────────────┬────────────┬────────────────────┐    │ │
//! │  │  │ hello      │ weather    │ clock-legacy       │    │ │
//! │  │  │ (builtin)  │ (package)  │ (single library)   │    │ │
//! │  │  └────────────┴────────────┴────────────────────┘    │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! │                          │                                  │
//! │  ┌───────────────────────┼───────────────────────────────┐ │
//! │  │     PluginLoader      │      PluginContext            │ │
//! │  │  - builtin factories  │  - 플러그인별 설정            │ │
//! │  │  - ModuleOpener       │  - EventBus                   │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!
//! PluginInstaller ── SourceFetcher / CatalogClient / DependencyInstaller
//! PluginUpdater   ── PluginInstaller + PluginManager
//! JobRunner       ── PluginInstaller (tokio 백그라운드)
//! ```
//!
//! ## 플러그인 형태
//!
//! 1. **Builtin**: 바이너리에 포함된 팩토리
//! 2. **Package**: `<dir>/<name>/plugin.yaml` + 공유 라이브러리
//! 3. **Legacy**: `<dir>/lib<name>.so` 단일 라이브러리 (매니페스트 없음)
//!
//! ## 예시
//!
//! ```ignore
//! // 플러그인 정의 (cdylib 크레이트)
//! #[derive(Default)]
//! struct Weather;
//!
//! impl Plugin for Weather {
//!     fn info(&self) -> PluginInfo { PluginInfo::new("weather", "1.0.0") }
//!     fn initialize(&mut self, ctx: &PluginContext) -> bool { true }
//! }
//!
//! declare_plugin!("weather", Weather::default());
//!
//! // 호스트
//! let mut plugins = PluginManager::from_settings(&settings, config, events);
//! plugins.load("weather")?;
//! ```

pub mod builtin;
pub mod catalog;
pub mod context;
pub mod deps;
pub mod fetch;
pub mod installer;
pub mod jobs;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod native;
pub mod registry;
pub mod source;
pub mod traits;
pub mod update;
pub mod version;

// Contract
pub use context::{PluginContext, PLUGIN_CONFIGS_KEY};
pub use traits::{HookError, HookResult, Plugin, PluginInfo, WidgetHandle};

// Loading
pub use loader::{BoundPlugin, PluginLoader, PluginOrigin};
pub use native::{
    BindError, LoadedModule, ModuleOpener, NativeOpener, PluginConstructor, PluginDeclaration,
    PluginFactory, ABI_VERSION, CORE_VERSION,
};

// Lifecycle
pub use manager::{PluginManager, PluginSummary, ENABLED_PLUGINS_KEY};
pub use registry::{PluginInstance, PluginRegistry};

// Installation / update
pub use catalog::{parse_catalog, CatalogClient, RemoteCatalogEntry};
pub use deps::DependencyInstaller;
pub use fetch::{GitFetcher, SourceFetcher};
pub use installer::{DependencyOutcome, InstallOutcome, PluginInstaller};
pub use jobs::{Job, JobOutput, JobResult, JobRunner};
pub use manifest::{InstalledPlugin, PluginManifest, MANIFEST_FILE};
pub use source::{PluginSource, SourceKind};
pub use update::{PluginUpdater, UpdateCandidate, UpdateOutcome};
pub use version::{compare as compare_versions, is_newer, VersionOrdering};
