//! Built-in plugins - 바이너리에 포함된 기본 플러그인
//!
//! 공유 라이브러리 없이 팩토리로 등록되며, 같은 이름의 설치된 패키지보다
//! 우선합니다.

mod hello;
mod stopwatch;
mod timer;

pub use hello::HelloPlugin;
pub use stopwatch::{format_elapsed, Stopwatch, StopwatchPlugin};
pub use timer::{format_remaining, Countdown, TimerPlugin, DEFAULT_MINUTES_KEY, PRESETS};

use super::native::PluginFactory;
use super::traits::Plugin;
use std::sync::Arc;

/// 기본 플러그인 팩토리 목록
pub fn factories() -> Vec<(&'static str, PluginFactory)> {
    vec![
        (hello::NAME, factory::<HelloPlugin>()),
        (stopwatch::NAME, factory::<StopwatchPlugin>()),
        (timer::NAME, factory::<TimerPlugin>()),
    ]
}

fn factory<P: Plugin + Default + 'static>() -> PluginFactory {
    Arc::new(|| Box::new(P::default()) as Box<dyn Plugin>)
}
