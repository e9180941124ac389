use crate::commands::CommandContext;
use crate::error::{BotResult, Error};
use crate::session::{IncomingMessage, Reply, SessionState};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, info};

/// View channels, send messages, read message history
const INVITE_PERMISSIONS: u64 = 1024 | 2048 | 65536;

/// Link that adds the bot to a server
pub fn invite_url(application_id: serenity::ApplicationId) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={}&scope=bot%20applications.commands&permissions={}",
        application_id, INVITE_PERMISSIONS
    )
}

/// Replies to a Discord message in its channel
struct DiscordReply {
    http: Arc<serenity::Http>,
    message: serenity::Message,
}

#[async_trait]
impl Reply for DiscordReply {
    async fn reply(&self, text: &str) -> BotResult<()> {
        self.message.reply(self.http.as_ref(), text).await?;
        Ok(())
    }
}

/// Gateway events that are not slash or prefix commands
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, CommandContext, Error>,
    data: &CommandContext,
) -> BotResult<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("{} is connected!", data_about_bot.user.name);
            let calendar_id = data.config.read().await.calendar_id.clone();
            info!("Creating events in calendar '{}'", calendar_id);

            // No server means no messages until someone invites the bot
            if data_about_bot.guilds.is_empty() {
                data.lifecycle
                    .on_pairing_code(&invite_url(data_about_bot.application.id));
            } else {
                data.lifecycle.on_ready();
            }
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            if data.lifecycle.state() == SessionState::AwaitingQrScan {
                info!("Added to server '{}'", guild.name);
                data.lifecycle.on_ready();
            }
        }
        serenity::FullEvent::Resume { .. } => {
            debug!("Gateway session resumed");
            if data.lifecycle.state() != SessionState::AwaitingQrScan {
                data.lifecycle.on_ready();
            }
        }
        serenity::FullEvent::Message { new_message } => {
            // Our own replies and other bots
            if new_message.author.bot {
                return Ok(());
            }

            if !data.lifecycle.accepts_messages() {
                debug!(
                    "Ignoring message while session is {:?}",
                    data.lifecycle.state()
                );
                return Ok(());
            }

            debug!("📥 Message: {}", new_message.content);
            let message = IncomingMessage::new(
                new_message.content.clone(),
                Arc::new(DiscordReply {
                    http: Arc::clone(&ctx.http),
                    message: new_message.clone(),
                }),
            );

            data.orchestrator.handle_message(&message).await;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_url() {
        let url = invite_url(serenity::ApplicationId::new(1234567890));
        assert!(url.starts_with("https://discord.com/oauth2/authorize?client_id=1234567890&"));
        assert!(url.ends_with("&permissions=68608"));
    }
}
