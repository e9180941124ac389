use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kalenteribotti::commands::event::{create_failed_reply, date_error_reply, format_error_reply};
use kalenteribotti::components::credentials::CredentialProvider;
use kalenteribotti::components::google_calendar::{CalendarClient, CreatedEvent, EventPayload};
use kalenteribotti::components::event_commands::CommandOutcome;
use kalenteribotti::components::EventOrchestrator;
use kalenteribotti::error::{google_calendar_error, oauth_error, unauthorized_error, BotResult};
use kalenteribotti::session::{IncomingMessage, Reply};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const EVENT_LINK: &str = "https://www.google.com/calendar/event?eid=c3RhbmR1cA";

/// Collects everything the bot says back
#[derive(Default)]
struct RecordingReply {
    replies: Mutex<Vec<String>>,
}

impl RecordingReply {
    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reply for RecordingReply {
    async fn reply(&self, text: &str) -> BotResult<()> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Calendar that records inserts and either succeeds or fails
struct MockCalendar {
    fail: bool,
    /// How many of the next inserts answer 401
    rejections: AtomicUsize,
    inserted: Mutex<Vec<(String, String, EventPayload)>>,
}

impl MockCalendar {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            rejections: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
        }
    }

    fn inserted(&self) -> Vec<(String, String, EventPayload)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarClient for MockCalendar {
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> BotResult<CreatedEvent> {
        self.inserted.lock().unwrap().push((
            access_token.to_string(),
            calendar_id.to_string(),
            event.clone(),
        ));

        let rejected = self
            .rejections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(unauthorized_error(
                "Failed to insert event: HTTP 401 Unauthorized - Invalid Credentials",
            ));
        }

        if self.fail {
            return Err(google_calendar_error(
                "Failed to insert event: HTTP 403 Forbidden - rateLimitExceeded",
            ));
        }

        Ok(CreatedEvent {
            id: Some("standup123".to_string()),
            html_link: EVENT_LINK.to_string(),
        })
    }
}

/// Hands out a fixed token, or fails like a broken token exchange
struct MockCredentials {
    fail: bool,
    calls: AtomicUsize,
    invalidated: Mutex<Vec<String>>,
}

impl MockCredentials {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
            invalidated: Mutex::new(Vec::new()),
        }
    }

    fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    async fn access_token(&self) -> BotResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(oauth_error("Token request failed: HTTP 400 - invalid_grant"));
        }
        if self.invalidated.lock().unwrap().is_empty() {
            Ok("ya29.test-token".to_string())
        } else {
            Ok("ya29.fresh-token".to_string())
        }
    }

    async fn invalidate(&self, rejected: &str) -> BotResult<()> {
        self.invalidated.lock().unwrap().push(rejected.to_string());
        Ok(())
    }
}

struct Harness {
    calendar: Arc<MockCalendar>,
    credentials: Arc<MockCredentials>,
    orchestrator: EventOrchestrator,
}

fn harness(calendar_fails: bool, credentials_fail: bool, timezone: chrono_tz::Tz) -> Harness {
    let calendar = Arc::new(MockCalendar::new(calendar_fails));
    let credentials = Arc::new(MockCredentials::new(credentials_fail));
    let orchestrator = EventOrchestrator::new(
        calendar.clone(),
        credentials.clone(),
        "primary",
        timezone,
    );
    Harness {
        calendar,
        credentials,
        orchestrator,
    }
}

// Saturday, 2026-06-20 at 10:00 UTC
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 20, 10, 0, 0).unwrap()
}

async fn send(harness: &Harness, body: &str) -> (CommandOutcome, Vec<String>) {
    let reply = Arc::new(RecordingReply::default());
    let message = IncomingMessage::new(body, reply.clone());
    let outcome = harness.orchestrator.handle_message_at(&message, now()).await;
    (outcome, reply.replies())
}

#[tokio::test]
async fn test_non_commands_are_ignored() {
    let harness = harness(false, false, chrono_tz::UTC);

    for body in ["hello", "meeting tomorrow?", "", "Eventually: yes | no", "📅 event: x | y"] {
        let (outcome, replies) = send(&harness, body).await;
        assert_eq!(outcome, CommandOutcome::NotACommand, "body: {body}");
        assert!(replies.is_empty(), "body: {body}");
    }

    assert!(harness.calendar.inserted().is_empty());
    assert_eq!(harness.credentials.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_creates_event_and_replies_with_link() {
    let harness = harness(false, false, chrono_tz::UTC);

    let (outcome, replies) = send(&harness, "Event: Standup | June 27, 15:00").await;

    assert!(matches!(outcome, CommandOutcome::Created(_)));
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(EVENT_LINK));

    let inserted = harness.calendar.inserted();
    assert_eq!(inserted.len(), 1);
    let (token, calendar_id, payload) = &inserted[0];
    assert_eq!(token, "ya29.test-token");
    assert_eq!(calendar_id, "primary");
    assert_eq!(payload.summary, "Standup");
    assert_eq!(payload.start.date_time, "2026-06-27T15:00:00+00:00");
    assert_eq!(payload.end.date_time, "2026-06-27T16:00:00+00:00");
}

#[tokio::test]
async fn test_end_is_one_hour_after_start() {
    let harness = harness(false, false, chrono_tz::Europe::Helsinki);

    for when in ["June 27, 15:00", "tomorrow 23:30", "in 2 hours", "next friday 9am"] {
        let body = format!("Event: Something | {when}");
        let (outcome, _) = send(&harness, &body).await;
        assert!(matches!(outcome, CommandOutcome::Created(_)), "when: {when}");
    }

    for (_, _, payload) in harness.calendar.inserted() {
        let start = DateTime::parse_from_rfc3339(&payload.start.date_time).unwrap();
        let end = DateTime::parse_from_rfc3339(&payload.end.date_time).unwrap();
        assert_eq!((end - start).num_seconds(), 3600);
    }
}

#[tokio::test]
async fn test_times_use_configured_timezone() {
    let harness = harness(false, false, chrono_tz::Europe::Helsinki);

    send(&harness, "event: Sauna | June 27, 18:00").await;

    let inserted = harness.calendar.inserted();
    assert_eq!(inserted[0].2.start.date_time, "2026-06-27T18:00:00+03:00");
}

#[tokio::test]
async fn test_malformed_command_gets_format_reply() {
    let harness = harness(false, false, chrono_tz::UTC);

    let (outcome, replies) = send(&harness, "Event: Standup").await;

    assert_eq!(outcome, CommandOutcome::Malformed);
    assert_eq!(replies, vec![format_error_reply()]);
    assert!(harness.calendar.inserted().is_empty());
}

#[tokio::test]
async fn test_unparseable_date_gets_date_reply() {
    let harness = harness(false, false, chrono_tz::UTC);

    let (outcome, replies) = send(&harness, "Event: Standup | whenever").await;

    assert_eq!(outcome, CommandOutcome::InvalidDate);
    assert_eq!(replies, vec![date_error_reply()]);
    assert!(harness.calendar.inserted().is_empty());
    assert_eq!(harness.credentials.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_calendar_failure_only_apologizes() {
    let harness = harness(true, false, chrono_tz::UTC);

    let (outcome, replies) = send(&harness, "Event: Standup | June 27, 15:00").await;

    assert_eq!(outcome, CommandOutcome::Failed);
    assert_eq!(replies, vec![create_failed_reply()]);
    assert!(!replies[0].contains("403"));
    assert!(!replies[0].contains("rateLimitExceeded"));
}

#[tokio::test]
async fn test_credential_failure_short_circuits_to_apology() {
    let harness = harness(false, true, chrono_tz::UTC);

    let (outcome, replies) = send(&harness, "Event: Standup | June 27, 15:00").await;

    assert_eq!(outcome, CommandOutcome::Failed);
    assert_eq!(replies, vec![create_failed_reply()]);
    assert!(!replies[0].contains("invalid_grant"));
    assert!(harness.calendar.inserted().is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_replaced_and_insert_retried() {
    let harness = harness(false, false, chrono_tz::UTC);
    harness.calendar.rejections.store(1, Ordering::SeqCst);

    let (outcome, replies) = send(&harness, "Event: Standup | June 27, 15:00").await;

    assert!(matches!(outcome, CommandOutcome::Created(_)));
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(EVENT_LINK));
    assert_eq!(harness.credentials.invalidated(), vec!["ya29.test-token"]);

    let tokens: Vec<String> = harness
        .calendar
        .inserted()
        .into_iter()
        .map(|(token, _, _)| token)
        .collect();
    assert_eq!(tokens, vec!["ya29.test-token", "ya29.fresh-token"]);
}

#[tokio::test]
async fn test_second_rejection_is_not_retried() {
    let harness = harness(false, false, chrono_tz::UTC);
    harness.calendar.rejections.store(5, Ordering::SeqCst);

    let (outcome, replies) = send(&harness, "Event: Standup | June 27, 15:00").await;

    assert_eq!(outcome, CommandOutcome::Failed);
    assert_eq!(replies, vec![create_failed_reply()]);
    assert_eq!(harness.calendar.inserted().len(), 2);
}

#[tokio::test]
async fn test_concurrent_commands_each_get_a_reply() {
    let harness = Arc::new(harness(false, false, chrono_tz::UTC));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let body = format!("Event: Task {i} | tomorrow 10:00");
                send(&harness, &body).await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let (outcome, replies) = result.unwrap();
        assert!(matches!(outcome, CommandOutcome::Created(_)));
        assert_eq!(replies.len(), 1);
    }

    assert_eq!(harness.calendar.inserted().len(), 8);
}
