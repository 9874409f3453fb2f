use crate::error::{config_error, env_error, BoardResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;

/// Default address of the kiosk web server
pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:3000";
/// Default weather provider base URL
pub const DEFAULT_WEATHER_API_BASE: &str = "https://api.openweathermap.org";
/// Default Google Calendar API base URL
pub const DEFAULT_GOOGLE_API_BASE: &str = "https://www.googleapis.com";
/// Default Google OAuth token endpoint
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Main configuration structure for the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone used for day bucketing and clock alignment
    pub timezone: String,
    /// UI locale
    pub board_locale: String,
    /// Address the kiosk web server binds to
    pub http_bind: String,
    /// Weather provider API key
    pub weather_api_key: Option<String>,
    /// Latitude of the forecast location
    pub weather_lat: f64,
    /// Longitude of the forecast location
    pub weather_lon: f64,
    /// Weather provider base URL
    pub weather_api_base: String,
    /// Google OAuth client ID
    pub google_client_id: Option<String>,
    /// Google OAuth client secret
    pub google_client_secret: Option<String>,
    /// Long-lived refresh token held as the service credential
    pub google_refresh_token: Option<String>,
    /// Google Calendar IDs, one source each
    pub google_calendar_ids: Vec<String>,
    /// Google Calendar API base URL
    pub google_api_base: String,
    /// Google OAuth token endpoint
    pub google_token_url: String,
    /// Subscription feed URLs, one source each
    pub ics_feed_urls: Vec<String>,
    /// Timeout for a single source fetch, in seconds
    pub source_timeout_secs: u64,
    /// Vertical scale of the schedule, shared with the kiosk page
    pub pixels_per_minute: f64,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        let mut components = HashMap::new();
        components.insert("calendar".to_string(), true);
        components.insert("weather".to_string(), true);
        components.insert("clock".to_string(), true);

        Self {
            timezone: "UTC".to_string(),
            board_locale: "en".to_string(),
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            weather_api_key: None,
            weather_lat: 60.1699,
            weather_lon: 24.9384,
            weather_api_base: DEFAULT_WEATHER_API_BASE.to_string(),
            google_client_id: None,
            google_client_secret: None,
            google_refresh_token: None,
            google_calendar_ids: Vec::new(),
            google_api_base: DEFAULT_GOOGLE_API_BASE.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            ics_feed_urls: Vec::new(),
            source_timeout_secs: 20,
            pixels_per_minute: 1.0,
            components,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BoardResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let timezone = env::var("TIMEZONE").unwrap_or(defaults.timezone);
        Tz::from_str(&timezone).map_err(|_| config_error(&format!("Invalid TIMEZONE: {}", timezone)))?;

        let mut components = defaults.components;

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            let file_components = toml::from_str::<HashMap<String, bool>>(&content)?;
            for (key, value) in file_components {
                components.insert(key, value);
            }
        }

        Ok(Config {
            timezone,
            board_locale: env::var("BOARD_LOCALE").unwrap_or(defaults.board_locale),
            http_bind: env::var("HTTP_BIND").unwrap_or(defaults.http_bind),
            weather_api_key: optional_var("WEATHER_API_KEY"),
            weather_lat: parse_var("WEATHER_LAT", defaults.weather_lat)?,
            weather_lon: parse_var("WEATHER_LON", defaults.weather_lon)?,
            weather_api_base: env::var("WEATHER_API_BASE").unwrap_or(defaults.weather_api_base),
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            google_refresh_token: optional_var("GOOGLE_REFRESH_TOKEN"),
            google_calendar_ids: env::var("GOOGLE_CALENDAR_IDS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            google_api_base: env::var("GOOGLE_API_BASE").unwrap_or(defaults.google_api_base),
            google_token_url: env::var("GOOGLE_TOKEN_URL").unwrap_or(defaults.google_token_url),
            ics_feed_urls: env::var("ICS_FEED_URLS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            source_timeout_secs: parse_var("SOURCE_TIMEOUT_SECS", defaults.source_timeout_secs)?,
            pixels_per_minute: parse_var("PIXELS_PER_MINUTE", defaults.pixels_per_minute)?,
            components,
        })
    }

    /// Parsed timezone
    pub fn tz(&self) -> BoardResult<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|_| config_error(&format!("Invalid TIMEZONE: {}", self.timezone)))
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

/// Non-empty environment variable, if set
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to a default when unset
fn parse_var<T: FromStr>(name: &str, default: T) -> BoardResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| env_error(&format!("Invalid {} format", name))),
        Err(_) => Ok(default),
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
