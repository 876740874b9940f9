//! Stopwatch - 경과 시간 측정 플러그인
//!
//! 측정 로직([`Stopwatch`])은 UI와 분리되어 있고, 호스트가 시각을 넘겨
//! 호출합니다.

use crate::plugin::context::PluginContext;
use crate::plugin::traits::{HookError, HookResult, Plugin, PluginInfo, WidgetHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub(super) const NAME: &str = "stopwatch";

// ============================================================================
// Stopwatch - 측정 상태
// ============================================================================

/// 시작/정지/랩/리셋 상태
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    /// 이전 구간들의 누적 시간
    accumulated: Duration,
    /// 실행 중이면 현재 구간 시작 시각
    started_at: Option<Instant>,
    /// 랩 기록 (시작부터의 경과 시간)
    laps: Vec<Duration>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// 시작 또는 재개
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// 일시 정지
    pub fn pause(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += now.saturating_duration_since(started);
        }
    }

    /// 실행 중이면 정지, 정지 중이면 시작
    pub fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.pause(now);
        } else {
            self.start(now);
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self.accumulated + now.saturating_duration_since(started),
            None => self.accumulated,
        }
    }

    /// 랩 기록 (정지 중이면 무시)
    ///
    /// 기록된 랩 번호(1부터)를 반환합니다.
    pub fn lap(&mut self, now: Instant) -> Option<usize> {
        if !self.is_running() {
            return None;
        }
        self.laps.push(self.elapsed(now));
        Some(self.laps.len())
    }

    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }

    /// 랩 표시 문자열 (`Lap 2: 00:01:05.20 (+00:00:30.10)`)
    pub fn lap_lines(&self) -> Vec<String> {
        self.laps
            .iter()
            .enumerate()
            .map(|(i, lap)| {
                let mut line = format!("Lap {}: {}", i + 1, format_elapsed(*lap));
                if i > 0 {
                    let split = lap.saturating_sub(self.laps[i - 1]);
                    line.push_str(&format!(" (+{})", format_elapsed(split)));
                }
                line
            })
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `HH:MM:SS.cc` 형식
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        elapsed.subsec_millis() / 10
    )
}

// ============================================================================
// StopwatchPlugin
// ============================================================================

#[derive(Debug, Default)]
pub struct StopwatchPlugin {
    stopwatch: Stopwatch,
    widget: Option<WidgetHandle>,
}

impl StopwatchPlugin {
    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn stopwatch_mut(&mut self) -> &mut Stopwatch {
        &mut self.stopwatch
    }
}

impl Plugin for StopwatchPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(NAME, "1.0.0")
            .with_author("Tickr Team")
            .with_description("Measures elapsed time with laps")
    }

    fn initialize(&mut self, _ctx: &PluginContext) -> bool {
        info!("[{}] initialized", NAME);
        true
    }

    fn shutdown(&mut self) -> HookResult {
        self.widget = None;
        self.stopwatch.reset();
        info!("[{}] shut down", NAME);
        Ok(())
    }

    fn create_widget(&mut self, parent: WidgetHandle) -> Result<Option<WidgetHandle>, HookError> {
        debug!("[{}] launcher attached to {}", NAME, parent);
        self.widget = Some(parent);
        Ok(Some(parent))
    }

    fn on_disable(&mut self) -> HookResult {
        // 비활성화 시 열린 창 닫기
        self.widget = None;
        self.stopwatch.pause(Instant::now());
        Ok(())
    }
}
