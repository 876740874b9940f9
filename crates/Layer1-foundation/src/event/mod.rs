//! Event System - 이벤트 발행/구독 시스템
//!
//! 플러그인 라이프사이클 변화를 UI 레이어와 영속화 레이어에 알립니다.
//! 코어의 정확성은 이벤트 수신 여부에 의존하지 않습니다.
//!
//! ## 사용법
//!
//! ```ignore
//! use tickr_foundation::event::{EventBus, names};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit(names::PLUGIN_ENABLED, serde_json::json!({ "plugin": "hello" }));
//! let event = rx.recv().await?;
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusConfig};
pub use types::{names, AppEvent};
