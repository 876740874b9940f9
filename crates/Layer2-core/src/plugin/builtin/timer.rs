//! Timer - 카운트다운 타이머 플러그인

use crate::plugin::context::PluginContext;
use crate::plugin::traits::{HookError, HookResult, Plugin, PluginInfo, WidgetHandle};
use std::time::Duration;
use tracing::{debug, info};

pub(super) const NAME: &str = "timer";

/// 기본 시간 설정 키 (`plugins.configs.timer.default_minutes`)
pub const DEFAULT_MINUTES_KEY: &str = "default_minutes";

const DEFAULT_MINUTES: u64 = 5;

/// 프리셋 (라벨, 초)
pub const PRESETS: &[(&str, u64)] = &[
    ("1 min", 60),
    ("3 min", 180),
    ("5 min", 300),
    ("10 min", 600),
    ("30 min", 1800),
];

// ============================================================================
// Countdown
// ============================================================================

/// 카운트다운 상태
///
/// 호스트가 주기적으로 [`Countdown::tick`]을 호출합니다.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    preset: Duration,
    remaining: Duration,
    running: bool,
}

impl Countdown {
    pub fn new(preset: Duration) -> Self {
        Self {
            preset,
            remaining: Duration::ZERO,
            running: false,
        }
    }

    /// 시간 설정 (실행 중이 아닐 때만)
    pub fn set(&mut self, hours: u64, minutes: u64, seconds: u64) {
        if !self.running {
            self.preset = Duration::from_secs(hours * 3600 + minutes * 60 + seconds);
        }
    }

    pub fn preset(&self) -> Duration {
        self.preset
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 시작 (설정 시간이 0이면 false)
    ///
    /// 일시 정지 상태였다면 남은 시간부터 재개합니다.
    pub fn start(&mut self) -> bool {
        if self.running {
            return true;
        }
        if self.remaining.is_zero() {
            self.remaining = self.preset;
        }
        if self.remaining.is_zero() {
            return false;
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = Duration::ZERO;
    }

    /// 시간 경과 (이번 호출로 종료되면 true)
    pub fn tick(&mut self, delta: Duration) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(delta);
        if self.remaining.is_zero() {
            self.running = false;
            return true;
        }
        false
    }
}

/// `HH:MM:SS` 형식 (소수점 이하 올림)
pub fn format_remaining(remaining: Duration) -> String {
    let mut total = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        total += 1;
    }
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

// ============================================================================
// TimerPlugin
// ============================================================================

#[derive(Debug, Default)]
pub struct TimerPlugin {
    countdown: Countdown,
    widget: Option<WidgetHandle>,
}

impl TimerPlugin {
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn countdown_mut(&mut self) -> &mut Countdown {
        &mut self.countdown
    }
}

impl Plugin for TimerPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(NAME, "1.0.0")
            .with_author("Tickr Team")
            .with_description("Countdown timer with presets")
    }

    fn initialize(&mut self, ctx: &PluginContext) -> bool {
        let minutes = ctx
            .get_config(DEFAULT_MINUTES_KEY, DEFAULT_MINUTES.into())
            .as_u64()
            .unwrap_or(DEFAULT_MINUTES);
        self.countdown = Countdown::new(Duration::from_secs(minutes * 60));
        info!("[{}] initialized ({} min default)", NAME, minutes);
        true
    }

    fn shutdown(&mut self) -> HookResult {
        self.widget = None;
        self.countdown.reset();
        info!("[{}] shut down", NAME);
        Ok(())
    }

    fn create_widget(&mut self, parent: WidgetHandle) -> Result<Option<WidgetHandle>, HookError> {
        debug!("[{}] launcher attached to {}", NAME, parent);
        self.widget = Some(parent);
        Ok(Some(parent))
    }

    fn on_disable(&mut self) -> HookResult {
        self.widget = None;
        self.countdown.pause();
        Ok(())
    }
}
