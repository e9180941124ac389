use crate::components::EventOrchestrator;
use crate::config::Config;
use crate::error::BotResult;
use crate::session::SessionLifecycle;
use std::sync::Arc;
use tokio::sync::RwLock;

// Export submodules
pub mod event;
pub mod util;

/// Shared context for commands and gateway events
#[derive(Debug)]
pub struct CommandContext {
    pub config: Arc<RwLock<Config>>,
    pub orchestrator: Arc<EventOrchestrator>,
    pub lifecycle: Arc<SessionLifecycle>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(
        config: Arc<RwLock<Config>>,
        orchestrator: Arc<EventOrchestrator>,
        lifecycle: Arc<SessionLifecycle>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            lifecycle,
        }
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

/// All application commands
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![
        // Utility commands
        util::ping(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_debug<T: std::fmt::Debug>() {}

    #[test]
    fn test_framework_data_is_debug() {
        // poise needs this to log framework errors
        assert_debug::<CommandContext>();
        assert_debug::<poise::FrameworkError<'static, CommandContext, crate::error::Error>>();
    }
}
