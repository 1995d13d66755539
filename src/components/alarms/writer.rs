use crate::components::google_calendar::models::{AlarmCandidate, EventTime, ExistingAlarm, NewEvent};
use crate::components::google_calendar::time::{format_local, to_local_wall_time};
use crate::components::google_calendar::{connect, fetch_upcoming_events, CalendarService};
use crate::config::Config;
use crate::error::{timestamp_error, CalResult, Error};
use chrono::Duration;
use chrono_tz::Tz;
use tracing::{debug, info};

use super::extract::{get_alarm_events, is_scheduled};

/// Insert body for `alarm`, as wall-clock time in `tz`
pub fn alarm_event(alarm: &AlarmCandidate, tz: Tz, duration_minutes: i64) -> CalResult<NewEvent> {
    let start = to_local_wall_time(&alarm.start, tz)?;
    let end = Duration::try_minutes(duration_minutes)
        .and_then(|duration| start.checked_add_signed(duration))
        .ok_or_else(|| timestamp_error(&format!("{start} plus {duration_minutes} minutes is out of range")))?;
    let zone = tz.name();

    Ok(NewEvent {
        summary: alarm.title.clone(),
        location: None,
        description: None,
        start: EventTime::local(format_local(&start), zone),
        end: EventTime::local(format_local(&end), zone),
    })
}

/// Create every alarm not yet on the destination calendar. Returns how many
/// were added.
pub async fn write_alarms_events(config: &Config, alarms: &[AlarmCandidate]) -> CalResult<usize> {
    let service = connect(&config.destination, &config.api_base_url).await?;
    write_missing_alarms(&service, config, alarms).await
}

/// Dedup `alarms` against the alarms `service` already holds and insert the rest
pub async fn write_missing_alarms<S: CalendarService + ?Sized>(
    service: &S,
    config: &Config,
    alarms: &[AlarmCandidate],
) -> CalResult<usize> {
    let tz = config.tz()?;
    let calendar_id = &config.destination.calendar_id;

    let existing_events =
        fetch_upcoming_events(service, calendar_id, config.max_results, config.lookback_hours).await?;
    let mut existing = get_alarm_events(&existing_events);
    debug!("{} alarms already scheduled", existing.len());

    let mut added = 0;
    for alarm in alarms {
        if is_scheduled(alarm, &existing, config.alarm.dedup) {
            debug!("Alarm at {} already exists", alarm.start);
            continue;
        }

        if config.dry_run {
            info!("Dry run: would set alarm at {}", alarm.start);
        } else {
            let event = alarm_event(alarm, tz, config.alarm.duration_minutes)
                .map_err(|e| partial_failure(added, e))?;
            service
                .insert_event(calendar_id, &event)
                .await
                .map_err(|e| partial_failure(added, e))?;
            info!("Alarm set successfully at {}", alarm.start);
        }

        // Duplicate candidates in one batch create a single alarm
        existing.push(ExistingAlarm {
            start: alarm.start.clone(),
            title: alarm.title.clone(),
        });
        added += 1;
    }

    Ok(added)
}

/// Errors after the first insert keep the count of alarms already created
fn partial_failure(added: usize, error: Error) -> Error {
    if added == 0 {
        return error;
    }
    Error::PartialWrite {
        added,
        message: error.to_string(),
    }
}
