use super::models::{CreatedEvent, EventPayload};
use crate::error::{google_calendar_error, unauthorized_error, BotResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Base URL of the Google Calendar v3 REST API
pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Remote calendar that events can be inserted into
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Insert an event and return what the API created
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> BotResult<CreatedEvent>;
}

/// Google Calendar over plain REST
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl GoogleCalendarClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, GOOGLE_CALENDAR_API)
    }

    /// Point the client somewhere else, used by tests
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> BotResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API URL cannot be a base"))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);

        Ok(url)
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> BotResult<CreatedEvent> {
        let url = self.events_url(calendar_id)?;
        debug!("Inserting event '{}' into {}", event.summary, calendar_id);

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to insert event: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            let message = format!("Failed to insert event: HTTP {} - {}", status, error_body);
            if status == StatusCode::UNAUTHORIZED {
                return Err(unauthorized_error(&message));
            }
            return Err(google_calendar_error(&message));
        }

        response
            .json::<CreatedEvent>()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse insert response: {}", e)))
    }
}
