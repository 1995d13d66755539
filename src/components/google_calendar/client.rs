use crate::config::DEFAULT_API_BASE_URL;
use crate::error::{google_calendar_error, CalResult};
use super::models::{CalendarEvent, EventList, NewEvent};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Parameters of an event listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub calendar_id: String,
    /// RFC 3339 lower bound on event end time
    pub time_min: String,
    pub max_results: u32,
}

/// The two calendar operations alarms need
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Single occurrences ordered by start time
    async fn list_events(&self, query: &EventQuery) -> CalResult<Vec<CalendarEvent>>;

    async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> CalResult<CalendarEvent>;
}

/// Google Calendar v3 REST client bound to one access token
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: &str, access_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Client for the public Google endpoint
    pub fn google(access_token: String) -> Self {
        Self::new(DEFAULT_API_BASE_URL, access_token)
    }

    /// `{base}/calendars/{id}/events` with the calendar id percent-encoded
    fn events_url(&self, calendar_id: &str) -> CalResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| google_calendar_error(&format!("Invalid API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(&["calendars", calendar_id, "events"]);
        Ok(url)
    }

    async fn check_status(response: reqwest::Response, action: &str) -> CalResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        Err(google_calendar_error(&format!(
            "Failed to {}: HTTP {} - {}",
            action, status, error_body
        )))
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn list_events(&self, query: &EventQuery) -> CalResult<Vec<CalendarEvent>> {
        let mut url = self.events_url(&query.calendar_id)?;
        url.query_pairs_mut()
            .append_pair("timeMin", &query.time_min)
            .append_pair("maxResults", &query.max_results.to_string())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        debug!("Listing events: {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

        let response = Self::check_status(response, "fetch events").await?;
        let list: EventList = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))?;

        Ok(list.items)
    }

    async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> CalResult<CalendarEvent> {
        let mut url = self.events_url(calendar_id)?;
        url.query_pairs_mut().append_pair("sendUpdates", "none");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to create event: {}", e)))?;

        let response = Self::check_status(response, "create event").await?;
        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse created event: {}", e)))
    }
}
