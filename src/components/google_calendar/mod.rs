pub mod client;
pub mod models;
pub mod oauth;
pub mod time;
pub mod token;

pub use client::{CalendarService, EventQuery, GoogleCalendarClient};
pub use models::{AlarmCandidate, CalendarEvent, EventTime, ExistingAlarm, NewEvent};
pub use oauth::authenticate;

use crate::config::CalendarAccount;
use crate::error::CalResult;
use chrono::Utc;
use tracing::info;

/// Fetch events with `timeMin` set to now minus `lookback_hours`, soonest first.
/// The service decides which events fall on or after that bound.
pub async fn fetch_upcoming_events<S: CalendarService + ?Sized>(
    service: &S,
    calendar_id: &str,
    max_results: u32,
    lookback_hours: i64,
) -> CalResult<Vec<CalendarEvent>> {
    let query = EventQuery {
        calendar_id: calendar_id.to_string(),
        time_min: time::time_min(Utc::now(), lookback_hours)?,
        max_results,
    };
    let events = service.list_events(&query).await?;
    info!("Fetched {} events from calendar {}", events.len(), calendar_id);
    Ok(events)
}

/// Authenticate `account` and return a client for it
pub async fn connect(account: &CalendarAccount, api_base_url: &str) -> CalResult<GoogleCalendarClient> {
    let access_token = authenticate(account).await?;
    Ok(GoogleCalendarClient::new(api_base_url, access_token))
}
