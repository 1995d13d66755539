use serde::{Deserialize, Serialize};

/// Start or end marker of an event as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a date instead of a date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// The `dateTime` value, falling back to `date`
    pub fn raw(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }

    /// Wall-clock time in an explicit timezone
    pub fn local(date_time: String, time_zone: &str) -> Self {
        Self {
            date_time: Some(date_time),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }
}

/// Simplified calendar event representation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    /// Events without a title come back without `summary`
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

/// Body sent to the insert endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
}

/// Response page of the events list endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct EventList {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
}

/// Alarm derived from a source event, not yet written anywhere
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlarmCandidate {
    /// RFC 3339 timestamp with numeric offset
    pub start: String,
    pub title: String,
}

/// Alarm already present on the destination calendar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExistingAlarm {
    /// Start exactly as the calendar service returned it
    pub start: String,
    pub title: String,
}
