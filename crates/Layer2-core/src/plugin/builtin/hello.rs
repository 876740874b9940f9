//! Hello - 가장 단순한 예제 플러그인

use crate::plugin::context::PluginContext;
use crate::plugin::traits::{HookError, HookResult, Plugin, PluginInfo, WidgetHandle};
use tracing::info;

pub(super) const NAME: &str = "hello";

#[derive(Debug, Default)]
pub struct HelloPlugin {
    greeting: String,
}

impl HelloPlugin {
    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

impl Plugin for HelloPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(NAME, "0.1.0")
            .with_author("Tickr Team")
            .with_description("A minimal Hello World plugin")
    }

    fn initialize(&mut self, ctx: &PluginContext) -> bool {
        self.greeting = ctx
            .get_config("greeting", "Hello, Tickr!".into())
            .as_str()
            .unwrap_or("Hello, Tickr!")
            .to_string();
        info!("[{}] initialized", NAME);
        true
    }

    fn shutdown(&mut self) -> HookResult {
        info!("[{}] shut down", NAME);
        Ok(())
    }

    fn create_widget(&mut self, parent: WidgetHandle) -> Result<Option<WidgetHandle>, HookError> {
        info!("[{}] rendering '{}' into {}", NAME, self.greeting, parent);
        Ok(Some(parent))
    }

    fn on_enable(&mut self) -> HookResult {
        info!("[{}] enabled", NAME);
        Ok(())
    }

    fn on_disable(&mut self) -> HookResult {
        info!("[{}] disabled", NAME);
        Ok(())
    }
}
