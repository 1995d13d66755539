use crate::components::google_calendar::models::CalendarEvent;
use crate::components::google_calendar::time::alarm_start;
use crate::config::WorkingHours;
use crate::error::CalResult;
use chrono::{DateTime, FixedOffset, Timelike};
use chrono_tz::Tz;

/// Whether an alarm firing at `start` is acceptable for an event titled `summary`
pub fn is_acceptable(summary: &str, start: &DateTime<FixedOffset>, working_hours: &WorkingHours) -> bool {
    summary.is_ascii() && working_hours.contains(start.hour())
}

/// Check the event title is ASCII and its alarm falls inside working hours.
///
/// The hour is taken from the alarm time, not the event time, so an event
/// just after the window opens can still be rejected.
pub fn is_valid_alarm(
    event: &CalendarEvent,
    lead_minutes: i64,
    working_hours: &WorkingHours,
    tz: Tz,
) -> CalResult<bool> {
    let start = alarm_start(event, lead_minutes, tz)?;
    Ok(is_acceptable(&event.summary, &start, working_hours))
}
