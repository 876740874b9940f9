//! Plugin traits - 핵심 플러그인 인터페이스
//!
//! 모든 훅은 `HookResult`를 반환하며, 레지스트리는 [`invoke_hook`]을 통해
//! 호출합니다. 에러와 패닉은 호출 지점에서 로그로 남고 라이프사이클
//! 작업을 중단시키지 않습니다.

use super::context::PluginContext;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

// ============================================================================
// PluginInfo - 코드에 선언된 식별 정보
// ============================================================================

/// 플러그인이 코드에 선언한 식별 정보
///
/// 매니페스트가 있으면 매니페스트 값이 우선합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: String::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// WidgetHandle
// ============================================================================

/// 호스트 UI 툴킷이 발급한 불투명 위젯 핸들
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetHandle(pub u64);

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

// ============================================================================
// HookError
// ============================================================================

/// 플러그인 훅 실패
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    /// 훅이 에러를 반환함
    #[error("{0}")]
    Failed(String),

    /// 훅 실행 중 패닉 발생
    #[error("panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// 훅 결과
pub type HookResult = std::result::Result<(), HookError>;

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 인스턴스는 레지스트리가 단독으로 소유하며 한 번에 한 스레드에서만
/// 호출되므로 `Sync`는 요구하지 않습니다.
pub trait Plugin: Send {
    /// 코드에 선언된 식별 정보
    fn info(&self) -> PluginInfo;

    /// 초기화
    ///
    /// `false`를 반환하면 레지스트리는 인스턴스를 등록하지 않습니다.
    fn initialize(&mut self, ctx: &PluginContext) -> bool;

    /// 정리
    ///
    /// `initialize`가 실패했거나 호출되지 않았어도 안전해야 합니다.
    fn shutdown(&mut self) -> HookResult {
        Ok(())
    }

    /// 위젯 생성 (선택 기능)
    fn create_widget(&mut self, _parent: WidgetHandle) -> Result<Option<WidgetHandle>, HookError> {
        Ok(None)
    }

    /// 활성화 시 호출
    fn on_enable(&mut self) -> HookResult {
        Ok(())
    }

    /// 비활성화 시 호출
    fn on_disable(&mut self) -> HookResult {
        Ok(())
    }
}

// ============================================================================
// Hook invocation
// ============================================================================

/// 훅 호출 (에러/패닉을 `HookError`로 변환하고 로그)
pub(crate) fn invoke_hook<T>(
    plugin: &str,
    hook: &str,
    f: impl FnOnce() -> Result<T, HookError>,
) -> Result<T, HookError> {
    let result = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HookError::Panicked(panic_message(payload.as_ref()))),
    };

    if let Err(e) = &result {
        warn!("Plugin {} hook {} failed: {}", plugin, hook, e);
    }
    result
}

/// `initialize` 호출 (패닉은 실패로 간주)
pub(crate) fn invoke_initialize(plugin: &mut dyn Plugin, name: &str, ctx: &PluginContext) -> bool {
    match catch_unwind(AssertUnwindSafe(|| plugin.initialize(ctx))) {
        Ok(ok) => ok,
        Err(payload) => {
            warn!(
                "Plugin {} panicked during initialize: {}",
                name,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
