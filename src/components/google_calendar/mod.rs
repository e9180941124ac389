mod client;
pub mod models;

pub use client::{CalendarClient, GoogleCalendarClient, GOOGLE_CALENDAR_API};
pub use models::{CreatedEvent, EventDateTime, EventPayload, EventWindow, EVENT_DURATION_SECS};
