use calclock::components::google_calendar::token::{StoredToken, TokenManager};
use calclock::components::google_calendar::{
    CalendarService, EventQuery, EventTime, GoogleCalendarClient, NewEvent,
};
use calclock::config::{CalendarAccount, READONLY_SCOPE};
use calclock::error::Error;
use chrono::Utc;
use serde_json::json;
use std::fs;
use std::path::Path;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query() -> EventQuery {
    EventQuery {
        calendar_id: "primary".to_string(),
        time_min: "2024-01-01T08:00:00Z".to_string(),
        max_results: 10,
    }
}

#[tokio::test]
async fn list_events_sends_query_and_parses_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("timeMin", "2024-01-01T08:00:00Z"))
        .and(query_param("maxResults", "10"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "calendar#events",
            "items": [
                {
                    "id": "a1",
                    "summary": "Design review",
                    "location": "Room 4",
                    "start": { "dateTime": "2024-01-01T14:00:00+02:00", "timeZone": "Asia/Jerusalem" },
                    "end": { "dateTime": "2024-01-01T15:00:00+02:00" }
                },
                {
                    "id": "a2",
                    "start": { "date": "2024-01-02" },
                    "end": { "date": "2024-01-03" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::new(&server.uri(), "access-1".to_string());
    let events = client.list_events(&query()).await.expect("events");

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].summary, "Design review");
    assert_eq!(events[0].location.as_deref(), Some("Room 4"));
    assert_eq!(events[0].start.raw(), Some("2024-01-01T14:00:00+02:00"));
    assert_eq!(events[1].summary, "");
    assert_eq!(events[1].start.raw(), Some("2024-01-02"));
}

#[tokio::test]
async fn list_events_without_items_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "calendar#events" })))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::new(&server.uri(), "t".to_string());
    assert!(client.list_events(&query()).await.unwrap().is_empty());
}

#[tokio::test]
async fn http_errors_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficientPermissions"))
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::new(&server.uri(), "t".to_string());
    let err = client.list_events(&query()).await.unwrap_err();

    match err {
        Error::GoogleCalendar(message) => {
            assert!(message.contains("403"));
            assert!(message.contains("insufficientPermissions"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn insert_event_posts_wall_time_and_zone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(query_param("sendUpdates", "none"))
        .and(header("authorization", "Bearer access-2"))
        .and(body_partial_json(json!({
            "summary": "Alarm",
            "start": { "dateTime": "2024-01-01T10:55:00", "timeZone": "Asia/Jerusalem" },
            "end": { "dateTime": "2024-01-01T10:55:00", "timeZone": "Asia/Jerusalem" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new1",
            "summary": "Alarm",
            "start": { "dateTime": "2024-01-01T10:55:00+02:00" },
            "end": { "dateTime": "2024-01-01T10:55:00+02:00" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleCalendarClient::new(&server.uri(), "access-2".to_string());
    let body = NewEvent {
        summary: "Alarm".to_string(),
        location: None,
        description: None,
        start: EventTime::local("2024-01-01T10:55:00".to_string(), "Asia/Jerusalem"),
        end: EventTime::local("2024-01-01T10:55:00".to_string(), "Asia/Jerusalem"),
    };

    let created = client.insert_event("primary", &body).await.expect("created");

    assert_eq!(created.id, "new1");
    assert_eq!(created.start.raw(), Some("2024-01-01T10:55:00+02:00"));
}

fn account_in(dir: &Path, token_uri: &str) -> CalendarAccount {
    let credential_file = dir.join("credentials.json");
    fs::write(
        &credential_file,
        json!({
            "installed": {
                "client_id": "client-1",
                "client_secret": "secret-1",
                "token_uri": token_uri
            }
        })
        .to_string(),
    )
    .unwrap();

    CalendarAccount {
        scopes: vec![READONLY_SCOPE.to_string()],
        token_file: dir.join("token.json"),
        credential_file,
        calendar_id: "primary".to_string(),
    }
}

fn write_token(account: &CalendarAccount, token: &StoredToken) {
    fs::write(&account.token_file, serde_json::to_string(token).unwrap()).unwrap();
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let account = account_in(dir.path(), &format!("{}/token", server.uri()));
    write_token(
        &account,
        &StoredToken {
            access_token: "stale".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Utc::now().timestamp() - 10,
            scopes: account.scopes.clone(),
        },
    );

    let token = TokenManager::for_account(&account)
        .get_token()
        .await
        .unwrap()
        .expect("token");

    assert_eq!(token.access_token, "fresh");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));

    let saved: StoredToken =
        serde_json::from_str(&fs::read_to_string(&account.token_file).unwrap()).unwrap();
    assert_eq!(saved, token);
}

#[tokio::test]
async fn valid_token_is_used_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let account = account_in(dir.path(), &format!("{}/token", server.uri()));
    write_token(
        &account,
        &StoredToken {
            access_token: "current".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Utc::now().timestamp() + 3600,
            scopes: account.scopes.clone(),
        },
    );

    let token = TokenManager::for_account(&account).get_token().await.unwrap();

    assert_eq!(token.map(|t| t.access_token).as_deref(), Some("current"));
}

#[tokio::test]
async fn missing_or_unrefreshable_token_needs_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let account = account_in(dir.path(), "http://127.0.0.1:9/token");

    assert!(TokenManager::for_account(&account).get_token().await.unwrap().is_none());

    write_token(
        &account,
        &StoredToken {
            access_token: "stale".to_string(),
            refresh_token: None,
            expires_at: 0,
            scopes: account.scopes.clone(),
        },
    );
    assert!(TokenManager::for_account(&account).get_token().await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_refresh_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let account = account_in(dir.path(), &format!("{}/token", server.uri()));
    write_token(
        &account,
        &StoredToken {
            access_token: "stale".to_string(),
            refresh_token: Some("revoked".to_string()),
            expires_at: 0,
            scopes: account.scopes.clone(),
        },
    );

    let result = TokenManager::for_account(&account).get_token().await;

    assert!(matches!(result, Err(Error::Auth(message)) if message.contains("invalid_grant")));
}
