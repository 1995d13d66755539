use crate::error::{timestamp_error, CalResult};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use super::models::CalendarEvent;

/// Format used for wall-clock times sent together with an explicit `timeZone`
const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parsed start of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStart {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl EventStart {
    /// Parse a `dateTime` (RFC 3339) or all-day `date` value
    pub fn parse(raw: &str) -> CalResult<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(EventStart::DateTime(dt));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(EventStart::Date)
            .map_err(|e| timestamp_error(&format!("{raw:?}: {e}")))
    }

    /// Resolve to an instant; all-day events start at midnight in `tz`
    pub fn to_datetime(&self, tz: Tz) -> CalResult<DateTime<FixedOffset>> {
        match self {
            EventStart::DateTime(dt) => Ok(*dt),
            EventStart::Date(date) => {
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| timestamp_error("Failed to create datetime"))?;
                match tz.from_local_datetime(&midnight) {
                    chrono::LocalResult::Single(dt) => Ok(dt.fixed_offset()),
                    chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
                    chrono::LocalResult::None => Err(timestamp_error(&format!(
                        "midnight of {date} does not exist in {tz}"
                    ))),
                }
            }
        }
    }
}

/// Get event start as a parsed value
pub fn get_event_start(event: &CalendarEvent) -> CalResult<EventStart> {
    let raw = event
        .start
        .raw()
        .ok_or_else(|| timestamp_error(&format!("event {:?} has no start", event.summary)))?;
    EventStart::parse(raw)
}

/// When the alarm for `event` fires
pub fn alarm_start(event: &CalendarEvent, lead_minutes: i64, tz: Tz) -> CalResult<DateTime<FixedOffset>> {
    let start = get_event_start(event)?.to_datetime(tz)?;
    Duration::try_minutes(lead_minutes)
        .and_then(|lead| start.checked_sub_signed(lead))
        .ok_or_else(|| timestamp_error(&format!("{start} minus {lead_minutes} minutes is out of range")))
}

/// RFC 3339 with seconds precision and a numeric offset, e.g. `2024-01-01T09:55:00+02:00`
pub fn format_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Lower bound of an event listing, `lookback_hours` before `now`
pub fn time_min(now: DateTime<Utc>, lookback_hours: i64) -> CalResult<String> {
    Duration::try_hours(lookback_hours)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| timestamp_error(&format!("{now} minus {lookback_hours} hours is out of range")))
}

/// Instant a timestamp string denotes, if it carries an offset
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a timestamp to wall-clock time in `tz`, without offset
pub fn to_local_wall_time(timestamp: &str, tz: Tz) -> CalResult<NaiveDateTime> {
    let dt = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| timestamp_error(&format!("{timestamp:?}: {e}")))?;
    Ok(dt.with_timezone(&tz).naive_local())
}

pub fn format_local(dt: &NaiveDateTime) -> String {
    dt.format(LOCAL_DATE_TIME_FORMAT).to_string()
}
