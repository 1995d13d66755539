pub mod extract;
pub mod validity;
pub mod writer;

pub use extract::{extract_alarms_from, get_alarm_events};
pub use validity::is_valid_alarm;
pub use writer::{write_alarms_events, write_missing_alarms};

use crate::components::google_calendar::models::AlarmCandidate;
use crate::components::google_calendar::{connect, fetch_upcoming_events, CalendarService};
use crate::config::Config;
use crate::error::CalResult;
use tracing::info;

/// Read the source calendar and derive alarm candidates from it
pub async fn generate_alarms(config: &Config) -> CalResult<Vec<AlarmCandidate>> {
    let service = connect(&config.source, &config.api_base_url).await?;
    generate_alarms_with(&service, config).await
}

pub async fn generate_alarms_with<S: CalendarService + ?Sized>(
    service: &S,
    config: &Config,
) -> CalResult<Vec<AlarmCandidate>> {
    let events = fetch_upcoming_events(
        service,
        &config.source.calendar_id,
        config.max_results,
        config.lookback_hours,
    )
    .await?;
    let alarms = extract_alarms_from(&events, &config.alarm, config.tz()?)?;
    info!("{} of {} events need an alarm", alarms.len(), events.len());
    Ok(alarms)
}

/// Full run: derive alarms from the source account, write missing ones to the
/// destination account
pub async fn run(config: &Config) -> CalResult<usize> {
    let alarms = generate_alarms(config).await?;
    write_alarms_events(config, &alarms).await
}

/// Same as [`run`] with already connected services
pub async fn run_with<S, D>(source: &S, destination: &D, config: &Config) -> CalResult<usize>
where
    S: CalendarService + ?Sized,
    D: CalendarService + ?Sized,
{
    let alarms = generate_alarms_with(source, config).await?;
    write_missing_alarms(destination, config, &alarms).await
}
