//! Event Bus - 이벤트 브로드캐스트 시스템

use super::types::AppEvent;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_size: 100,
        }
    }
}

struct Inner {
    config: EventBusConfig,
    sender: broadcast::Sender<AppEvent>,
    history: Mutex<VecDeque<AppEvent>>,
}

/// 이벤트 버스
///
/// 복제 비용이 낮은 핸들입니다. 모든 복제본은 같은 채널을 공유합니다.
/// `emit`은 동기 함수이며 수신자가 없어도 실패하지 않습니다.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                sender,
                history: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// 이벤트 발행
    pub fn emit(&self, name: &str, data: Value) {
        self.publish(AppEvent::new(name, data, "tickr"));
    }

    /// 이벤트 객체 발행
    pub fn publish(&self, event: AppEvent) {
        trace!(event = %event.name, "Publishing event");

        {
            let mut history = self.inner.history.lock();
            history.push_back(event.clone());
            while history.len() > self.inner.config.history_size {
                history.pop_front();
            }
        }

        // 수신자가 없으면 Err - 무시
        let _ = self.inner.sender.send(event);
    }

    /// 브로드캐스트 수신자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.inner.sender.subscribe()
    }

    /// 최근 이벤트 (최신순)
    pub fn history(&self, limit: Option<usize>) -> Vec<AppEvent> {
        let history = self.inner.history.lock();
        let limit = limit.unwrap_or(history.len());
        history.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.inner.sender.receiver_count())
            .finish()
    }
}
