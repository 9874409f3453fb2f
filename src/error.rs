use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(statusboard::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(statusboard::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(statusboard::google_calendar))]
    GoogleCalendar(String),

    #[error("Calendar feed error: {0}")]
    #[diagnostic(code(statusboard::feed))]
    Feed(String),

    #[error("Weather provider error: {0}")]
    #[diagnostic(code(statusboard::weather))]
    Weather(String),

    #[error("Missing credentials: {0}")]
    #[diagnostic(
        code(statusboard::missing_credentials),
        help("set the variable in the environment or in .env")
    )]
    MissingCredentials(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(statusboard::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(statusboard::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(statusboard::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(statusboard::other))]
    Other(String),
}

impl Error {
    /// Stable diagnostic code, used as the named error state shown on the board
    pub fn code_name(&self) -> String {
        self.code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "statusboard::other".to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BoardResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(message: &str) -> Error {
    Error::Environment(message.to_string())
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create subscription feed errors
pub fn feed_error(message: &str) -> Error {
    Error::Feed(message.to_string())
}

/// Helper to create weather errors
pub fn weather_error(message: &str) -> Error {
    Error::Weather(message.to_string())
}

/// Helper to create missing credential errors
pub fn missing_credentials(what: &str) -> Error {
    Error::MissingCredentials(what.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
