use crate::commands::{get_all_application_commands, CommandContext};
use crate::components::credentials::ConsolePrompt;
use crate::components::{CredentialHandle, EventOrchestrator, GoogleCalendarClient};
use crate::config::Config;
use crate::error::{session_error, BotResult, Error};
use crate::handlers;
use crate::session::{log_state_changes, ReconnectPolicy, SessionLifecycle};
use crate::shutdown;
use poise::serenity_prelude as serenity;
use rust_i18n::t;
use serenity::model::user::OnlineStatus;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn,poise=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Everything one Discord client needs; rebuilt after a lost session
#[derive(Clone)]
struct SessionParts {
    token: String,
    activity: String,
    config: Arc<RwLock<Config>>,
    orchestrator: Arc<EventOrchestrator>,
    lifecycle: Arc<SessionLifecycle>,
}

/// Initialize and start the Discord bot
pub async fn start_bot(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let config_snapshot = config.read().await.clone();

    // Set locale from config
    crate::utils::i18n::set_locale(&config_snapshot.bot_locale);
    info!("Setting locale to {}", config_snapshot.bot_locale);

    let timezone = config_snapshot.tz()?;
    info!("Resolving event times in {}", timezone);

    let credentials = CredentialHandle::from_config(&config_snapshot, Arc::new(ConsolePrompt))?;

    // Authorize before connecting so the console prompt does not hold up messages
    match credentials.authorize().await {
        Ok(_) => info!("Google Calendar credentials ready"),
        Err(e) => warn!("Authorization did not complete, will retry on first command: {}", e),
    }

    let orchestrator = Arc::new(EventOrchestrator::new(
        Arc::new(GoogleCalendarClient::default()),
        Arc::new(credentials.clone()),
        config_snapshot.calendar_id.clone(),
        timezone,
    ));

    let lifecycle = Arc::new(SessionLifecycle::new());
    tokio::spawn(log_state_changes(lifecycle.subscribe()));
    let policy = ReconnectPolicy::new(config_snapshot.max_reconnect_attempts);

    let parts = SessionParts {
        token: config_snapshot.discord_token.clone(),
        activity: config_snapshot.activity.clone(),
        config: Arc::clone(&config),
        orchestrator,
        lifecycle: Arc::clone(&lifecycle),
    };

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let shutdown_lifecycle = Arc::clone(&lifecycle);
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, credentials, shutdown_lifecycle).await;
    });

    // Wait for either the session to give up or a shutdown signal
    tokio::select! {
        result = run_session(parts, policy) => {
            info!("Bot process ended");
            result.map_err(Into::into)
        }
        _ = shutdown_recv => {
            info!("Received shutdown signal, shutting down bot...");
            Ok(())
        }
    }
}

/// Run Discord clients until the reconnect policy is exhausted
async fn run_session(parts: SessionParts, policy: ReconnectPolicy) -> BotResult<()> {
    loop {
        info!("Starting bot...");
        let result = match build_client(parts.clone()).await {
            Ok(mut client) => client.start().await.map_err(Error::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => warn!("Chat session ended"),
            Err(e) => error!("Chat session lost: {}", e),
        }

        match parts.lifecycle.on_session_lost(&policy) {
            Some(delay) => {
                info!("Reconnecting in {:?}", delay);
                sleep(delay).await;
            }
            None => {
                return Err(session_error(&format!(
                    "Chat session could not be restored after {} attempts",
                    policy.max_attempts()
                )));
            }
        }
    }
}

async fn build_client(parts: SessionParts) -> BotResult<serenity::Client> {
    let options = poise::FrameworkOptions {
        commands: get_all_application_commands(),
        on_error: |error| Box::pin(on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(handlers::event_handler(ctx, event, framework, data))
        },
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("!".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    // Plain messages carry the event commands
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let SessionParts {
        token,
        activity,
        config,
        orchestrator,
        lifecycle,
    } = parts;

    let framework = poise::Framework::new(options, move |ctx, _ready, framework| {
        Box::pin(async move {
            // Set the bot's status
            ctx.set_presence(
                Some(serenity::ActivityData::playing(&activity)),
                OnlineStatus::Online,
            );
            info!("Setting activity to {}", activity);

            // Register slash commands
            if let Err(e) =
                poise::builtins::register_globally(ctx, &framework.options().commands).await
            {
                error!("Failed to register slash commands: {:?}", e);
            } else {
                info!("Slash commands registered successfully");
            }

            Ok(CommandContext::new(config, orchestrator, lifecycle))
        })
    });

    serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .map_err(Error::from)
}

/// Handle errors from commands
async fn on_error(error: poise::FrameworkError<'_, CommandContext, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Error during setup: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command '{}': {:?}", ctx.command().name, error);
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .content(t!("error_title", context = "command"))
                        .ephemeral(true),
                )
                .await
            {
                error!("Error while sending error message: {:?}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error handling event {}: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            error!("Other error: {:?}", error);
        }
    }
}
