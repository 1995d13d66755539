use crate::error::{config_error, env_error, CalResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Scope for the account alarms are derived from
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
/// Scope for the account alarms are written to
pub const EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

pub const DEFAULT_CONFIG_PATH: &str = "config/calclock.toml";
pub const DEFAULT_TIMEZONE: &str = "Asia/Jerusalem";
pub const DEFAULT_ALARM_TITLE: &str = "Alarm";
/// Substring that marks an event as an alarm
pub const ALARM_MARKER: &str = "Alarm";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Longest accepted alarm lead time, one week
pub const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;
/// Longest accepted alarm event, one day
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;
/// Furthest the event listing may reach back, one week
pub const MAX_LOOKBACK_HOURS: i64 = 7 * 24;

/// Inclusive hour window an alarm is allowed to fire in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: u32,
    pub end: u32,
}

impl WorkingHours {
    pub fn new(start: u32, end: u32) -> CalResult<Self> {
        let hours = Self { start, end };
        hours.validate()?;
        Ok(hours)
    }

    /// Check that both bounds are clock hours and the window is not inverted
    pub fn validate(&self) -> CalResult<()> {
        if self.start > 23 || self.end > 23 {
            return Err(config_error(&format!(
                "working hours must be within 0-23, got {}-{}",
                self.start, self.end
            )));
        }
        if self.start > self.end {
            return Err(config_error(&format!(
                "working hours start ({}) is after end ({})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour <= self.end
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self { start: 11, end: 20 }
    }
}

impl FromStr for WorkingHours {
    type Err = crate::error::Error;

    /// Parse a window written as `START-END`, e.g. `11-20`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| config_error(&format!("working hours must look like 11-20, got {s:?}")))?;
        let start = start
            .trim()
            .parse::<u32>()
            .map_err(|_| config_error(&format!("invalid working hours start: {start:?}")))?;
        let end = end
            .trim()
            .parse::<u32>()
            .map_err(|_| config_error(&format!("invalid working hours end: {end:?}")))?;
        Self::new(start, end)
    }
}

/// How candidate alarms are matched against alarms already on the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Exact string equality of start timestamps
    #[default]
    Literal,
    /// Equality of the instants the timestamps denote
    Instant,
}

/// Credentials and target calendar for one Google account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarAccount {
    /// OAuth scopes requested for this account
    pub scopes: Vec<String>,
    /// Where the access/refresh token pair is cached
    pub token_file: PathBuf,
    /// OAuth client secret JSON downloaded from the Google Cloud console
    pub credential_file: PathBuf,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

impl CalendarAccount {
    /// Read-only account events are read from
    pub fn source_default() -> Self {
        Self {
            scopes: vec![READONLY_SCOPE.to_string()],
            token_file: PathBuf::from("token_cal1.json"),
            credential_file: PathBuf::from("credentials_cal1.json"),
            calendar_id: default_calendar_id(),
        }
    }

    /// Write-capable account alarms are created in
    pub fn destination_default() -> Self {
        Self {
            scopes: vec![EVENTS_SCOPE.to_string()],
            token_file: PathBuf::from("token_cal2.json"),
            credential_file: PathBuf::from("credentials_cal2.json"),
            calendar_id: default_calendar_id(),
        }
    }
}

/// Alarm derivation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    /// Minutes before the event the alarm fires
    pub lead_minutes: i64,
    pub working_hours: WorkingHours,
    /// Title of created alarms
    pub title: String,
    /// Length of created alarm events; 0 makes start and end equal
    pub duration_minutes: i64,
    pub dedup: DedupMode,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            lead_minutes: 10,
            working_hours: WorkingHours::default(),
            title: DEFAULT_ALARM_TITLE.to_string(),
            duration_minutes: 0,
            dedup: DedupMode::default(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: CalendarAccount,
    pub destination: CalendarAccount,
    pub alarm: AlarmSettings,
    /// IANA timezone used for created alarms and for all-day events
    pub timezone: String,
    /// Maximum number of events fetched per calendar
    pub max_results: u32,
    /// How far into the past the event listing reaches
    pub lookback_hours: i64,
    /// Log alarms instead of creating them
    pub dry_run: bool,
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: CalendarAccount::source_default(),
            destination: CalendarAccount::destination_default(),
            alarm: AlarmSettings::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            max_results: 10,
            lookback_hours: 2,
            dry_run: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> CalResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let path = env::var("CALCLOCK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            info!("Loading configuration from {}", path);
            Self::from_file(&path)?
        } else {
            debug!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file without validating it
    pub fn from_file(path: impl AsRef<Path>) -> CalResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CalResult<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> CalResult<()> {
        self.apply_overrides(|var| env::var(var).ok())
    }

    /// Apply `CALCLOCK_*` overrides, reading each variable through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CalResult<()> {
        if let Some(timezone) = lookup("CALCLOCK_TIMEZONE") {
            self.timezone = timezone;
        }
        if let Some(lead) = parse_override::<i64>(&lookup, "CALCLOCK_LEAD_MINUTES")? {
            self.alarm.lead_minutes = lead;
        }
        if let Some(hours) = parse_override::<WorkingHours>(&lookup, "CALCLOCK_WORKING_HOURS")? {
            self.alarm.working_hours = hours;
        }
        if let Some(max_results) = parse_override::<u32>(&lookup, "CALCLOCK_MAX_RESULTS")? {
            self.max_results = max_results;
        }
        if let Some(value) = lookup("CALCLOCK_DRY_RUN") {
            self.dry_run = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> CalResult<()> {
        self.alarm.working_hours.validate()?;
        self.tz()?;
        if !(0..=MAX_LEAD_MINUTES).contains(&self.alarm.lead_minutes) {
            return Err(config_error(&format!(
                "alarm lead time must be within 0-{} minutes, got {}",
                MAX_LEAD_MINUTES, self.alarm.lead_minutes
            )));
        }
        if !(0..=MAX_DURATION_MINUTES).contains(&self.alarm.duration_minutes) {
            return Err(config_error(&format!(
                "alarm duration must be within 0-{} minutes, got {}",
                MAX_DURATION_MINUTES, self.alarm.duration_minutes
            )));
        }
        if !(0..=MAX_LOOKBACK_HOURS).contains(&self.lookback_hours) {
            return Err(config_error(&format!(
                "lookback_hours must be within 0-{}, got {}",
                MAX_LOOKBACK_HOURS, self.lookback_hours
            )));
        }
        if self.max_results == 0 {
            return Err(config_error("max_results must be at least 1"));
        }
        if !self.alarm.title.contains(ALARM_MARKER) {
            return Err(config_error(&format!(
                "alarm title must contain \"{}\" so created alarms are recognized on later runs",
                ALARM_MARKER
            )));
        }
        if self.source.token_file == self.destination.token_file {
            return Err(config_error(
                "source and destination accounts must use separate token files",
            ));
        }
        Ok(())
    }

    /// Parsed form of `timezone`
    pub fn tz(&self) -> CalResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid timezone: {}", self.timezone)))
    }
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

/// Read and parse an optional override variable
fn parse_override<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, var: &str) -> CalResult<Option<T>> {
    match lookup(var) {
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| env_error(var)),
        None => Ok(None),
    }
}
