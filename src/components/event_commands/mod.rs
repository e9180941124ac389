use crate::commands::event::{
    create_failed_reply, created_reply, date_error_reply, format_error_reply, parse_command,
    CommandParse,
};
use crate::components::credentials::CredentialProvider;
use crate::components::google_calendar::{CalendarClient, CreatedEvent, EventPayload, EventWindow};
use crate::error::{BotResult, Error};
use crate::session::IncomingMessage;
use crate::utils::time::parse_natural_datetime;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What happened to one incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    NotACommand,
    Malformed,
    InvalidDate,
    Created(CreatedEvent),
    Failed,
}

impl CommandOutcome {
    /// Text sent back to the chat, if any
    pub fn reply_text(&self) -> Option<String> {
        match self {
            CommandOutcome::NotACommand => None,
            CommandOutcome::Malformed => Some(format_error_reply()),
            CommandOutcome::InvalidDate => Some(date_error_reply()),
            CommandOutcome::Created(event) => Some(created_reply(&event.html_link)),
            CommandOutcome::Failed => Some(create_failed_reply()),
        }
    }
}

/// Turns event commands into calendar events
pub struct EventOrchestrator {
    calendar: Arc<dyn CalendarClient>,
    credentials: Arc<dyn CredentialProvider>,
    calendar_id: String,
    timezone: Tz,
}

impl fmt::Debug for EventOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOrchestrator")
            .field("calendar_id", &self.calendar_id)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl EventOrchestrator {
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        credentials: Arc<dyn CredentialProvider>,
        calendar_id: impl Into<String>,
        timezone: Tz,
    ) -> Self {
        Self {
            calendar,
            credentials,
            calendar_id: calendar_id.into(),
            timezone,
        }
    }

    /// Handle one chat message and reply to it when it was a command
    pub async fn handle_message(&self, message: &IncomingMessage) -> CommandOutcome {
        self.handle_message_at(message, Utc::now()).await
    }

    /// Same as [`handle_message`](Self::handle_message) with a fixed "now" for date resolution
    pub async fn handle_message_at(
        &self,
        message: &IncomingMessage,
        now: DateTime<Utc>,
    ) -> CommandOutcome {
        let span = info_span!("event_command", request_id = %Uuid::new_v4());

        async {
            let outcome = self.process(&message.body, now).await;

            if let Some(text) = outcome.reply_text() {
                if let Err(e) = message.reply.reply(&text).await {
                    error!("Failed to send reply: {}", e);
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn process(&self, body: &str, now: DateTime<Utc>) -> CommandOutcome {
        let command = match parse_command(body) {
            CommandParse::NotACommand => return CommandOutcome::NotACommand,
            CommandParse::Malformed => {
                info!("Malformed event command: {}", body);
                return CommandOutcome::Malformed;
            }
            CommandParse::Command(command) => command,
        };

        let now = now.with_timezone(&self.timezone);
        let Some(start) = parse_natural_datetime(&command.raw_date_time, &now) else {
            info!("Could not resolve date '{}'", command.raw_date_time);
            return CommandOutcome::InvalidDate;
        };

        let window = EventWindow::starting_at(start.fixed_offset());
        info!(
            "📅 Creating event: \"{}\" at {}",
            command.title,
            window.start.to_rfc3339()
        );

        match self.create_event(&command.title, &window).await {
            Ok(created) => {
                info!("✅ Event created: {}", created.html_link);
                CommandOutcome::Created(created)
            }
            Err(e) => {
                error!("❌ Calendar error: {}", e);
                CommandOutcome::Failed
            }
        }
    }

    async fn create_event(&self, title: &str, window: &EventWindow) -> BotResult<CreatedEvent> {
        let access_token = self.credentials.access_token().await?;
        let payload = EventPayload::new(title, window);

        match self
            .calendar
            .insert_event(&access_token, &self.calendar_id, &payload)
            .await
        {
            // Retried once with a fresh token
            Err(Error::Unauthorized(reason)) => {
                warn!("Calendar rejected the access token: {}", reason);
                self.credentials.invalidate(&access_token).await?;
                let access_token = self.credentials.access_token().await?;
                self.calendar
                    .insert_event(&access_token, &self.calendar_id, &payload)
                    .await
            }
            result => result,
        }
    }
}
