use chrono::{FixedOffset, TimeZone};
use kalenteribotti::components::google_calendar::{
    CalendarClient, EventPayload, EventWindow, GoogleCalendarClient,
};
use kalenteribotti::error::Error;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn standup() -> EventPayload {
    let offset = FixedOffset::east_opt(3 * 3600).unwrap();
    let start = offset.with_ymd_and_hms(2026, 6, 23, 10, 0, 0).unwrap();
    EventPayload::new("Standup", &EventWindow::starting_at(start))
}

#[tokio::test]
async fn test_insert_event_posts_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer ya29.token"))
        .and(body_json(json!({
            "summary": "Standup",
            "start": { "dateTime": "2026-06-23T10:00:00+03:00" },
            "end": { "dateTime": "2026-06-23T11:00:00+03:00" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "calendar#event",
            "id": "abc123",
            "status": "confirmed",
            "htmlLink": "https://www.google.com/calendar/event?eid=YWJjMTIz",
            "summary": "Standup",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_base_url(reqwest::Client::new(), server.uri());
    let created = client
        .insert_event("ya29.token", "primary", &standup())
        .await
        .unwrap();

    assert_eq!(created.id.as_deref(), Some("abc123"));
    assert_eq!(
        created.html_link,
        "https://www.google.com/calendar/event?eid=YWJjMTIz"
    );
}

#[tokio::test]
async fn test_calendar_id_is_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/family%23home@group.calendar.google.com/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "htmlLink": "https://www.google.com/calendar/event?eid=ZmFtaWx5",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_base_url(reqwest::Client::new(), server.uri());
    let created = client
        .insert_event("ya29.token", "family#home@group.calendar.google.com", &standup())
        .await
        .unwrap();

    assert_eq!(created.id, None);
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_base_url(reqwest::Client::new(), server.uri());
    let error = client
        .insert_event("expired", "primary", &standup())
        .await
        .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("Invalid Credentials"), "{message}");
    assert!(matches!(error, Error::Unauthorized(_)));
}

#[tokio::test]
async fn test_forbidden_is_not_a_token_problem() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Rate Limit Exceeded" }
        })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_base_url(reqwest::Client::new(), server.uri());
    let error = client
        .insert_event("ya29.token", "primary", &standup())
        .await
        .unwrap_err();

    assert!(matches!(error, Error::GoogleCalendar(_)));
}

#[tokio::test]
async fn test_response_without_link_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc123" })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::with_base_url(reqwest::Client::new(), server.uri());
    assert!(client
        .insert_event("ya29.token", "primary", &standup())
        .await
        .is_err());
}
