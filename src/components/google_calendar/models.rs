use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Length of every event created from chat
pub const EVENT_DURATION_SECS: i64 = 3600;

/// Start and end of an event; `end` is always `start` plus one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl EventWindow {
    pub fn starting_at(start: DateTime<FixedOffset>) -> Self {
        Self {
            start,
            end: start + Duration::seconds(EVENT_DURATION_SECS),
        }
    }
}

/// Start or end of an event as sent to the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// Body of an events.insert request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

impl EventPayload {
    pub fn new(summary: impl Into<String>, window: &EventWindow) -> Self {
        Self {
            summary: summary.into(),
            start: EventDateTime {
                date_time: window.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            },
            end: EventDateTime {
                date_time: window.end.to_rfc3339_opts(SecondsFormat::Secs, false),
            },
        }
    }
}

/// The part of the API response we care about
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatedEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "htmlLink")]
    pub html_link: String,
}
