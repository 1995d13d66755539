use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(calclock::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calclock::config))]
    Config(String),

    #[error("Authentication error: {0}")]
    #[diagnostic(
        code(calclock::auth),
        help("run `get_calendar_token <source|destination>` to authorize the account again")
    )]
    Auth(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(calclock::google_calendar))]
    GoogleCalendar(String),

    #[error("Invalid event timestamp: {0}")]
    #[diagnostic(code(calclock::timestamp))]
    Timestamp(String),

    /// Raised when an insert fails after earlier alarms in the same batch
    /// were already created. Those alarms stay created.
    #[error("Alarm write stopped after {added} alarm(s) were added: {message}")]
    #[diagnostic(
        code(calclock::partial_write),
        help("already created alarms are kept; rerunning skips them")
    )]
    PartialWrite { added: usize, message: String },

    #[error(transparent)]
    #[diagnostic(code(calclock::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calclock::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(calclock::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON errors (token cache, client secrets, API bodies)
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type CalResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create timestamp errors
pub fn timestamp_error(message: &str) -> Error {
    Error::Timestamp(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
