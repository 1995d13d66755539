use crate::components::google_calendar::models::{AlarmCandidate, CalendarEvent, ExistingAlarm};
use crate::components::google_calendar::time::{alarm_start, format_timestamp, parse_instant};
use crate::config::{AlarmSettings, DedupMode, ALARM_MARKER};
use crate::error::CalResult;
use chrono_tz::Tz;
use tracing::debug;

use super::validity::is_acceptable;

/// Derive one alarm per acceptable event, in input order
pub fn extract_alarms_from(
    events: &[CalendarEvent],
    settings: &AlarmSettings,
    tz: Tz,
) -> CalResult<Vec<AlarmCandidate>> {
    let mut alarms = Vec::new();
    for event in events {
        let start = alarm_start(event, settings.lead_minutes, tz)?;
        if is_acceptable(&event.summary, &start, &settings.working_hours) {
            alarms.push(AlarmCandidate {
                start: format_timestamp(&start),
                title: settings.title.clone(),
            });
        } else {
            debug!("Skipping {:?}: alarm at {} not allowed", event.summary, start);
        }
    }
    Ok(alarms)
}

/// Events whose title contains the alarm marker
pub fn get_alarm_events(events: &[CalendarEvent]) -> Vec<ExistingAlarm> {
    events
        .iter()
        .filter(|event| event.summary.contains(ALARM_MARKER))
        .filter_map(|event| {
            event.start.raw().map(|start| ExistingAlarm {
                start: start.to_string(),
                title: event.summary.clone(),
            })
        })
        .collect()
}

/// Whether two start timestamps refer to the same alarm slot
pub fn same_start(a: &str, b: &str, mode: DedupMode) -> bool {
    match mode {
        DedupMode::Literal => a == b,
        DedupMode::Instant => match (parse_instant(a), parse_instant(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
    }
}

/// Whether `alarm` is already present among `existing`
pub fn is_scheduled(alarm: &AlarmCandidate, existing: &[ExistingAlarm], mode: DedupMode) -> bool {
    existing
        .iter()
        .any(|existing| same_start(&existing.start, &alarm.start, mode))
}
