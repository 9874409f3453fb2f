use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Provider condition, e.g. code 500 "light rain"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: u32,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunEventKind {
    Sunrise,
    Sunset,
}

/// The next sunrise or sunset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunEvent {
    pub kind: SunEventKind,
    pub at: DateTime<Utc>,
    /// Local "HH:MM"
    pub local_time: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhaseName {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    pub phase: MoonPhaseName,
    /// Days since the last new moon
    pub age_days: f64,
    /// Lit fraction of the disc, 0..=1
    pub illumination: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub at: DateTime<Utc>,
    /// Local "HH:MM"
    pub label: String,
    pub temperature: f64,
    pub condition: Condition,
    /// Percent
    pub precipitation_probability: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub weekday: String,
    pub high: f64,
    pub low: f64,
    pub condition: Condition,
    /// Percent
    pub precipitation_probability: u8,
}

/// Weather for the board. Celsius, km/h and cm throughout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub feels_like: f64,
    pub high: f64,
    pub low: f64,
    pub condition: Condition,
    /// Percent
    pub humidity: u8,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: f64,
    /// 16-point compass label, e.g. "SSW"
    pub wind_compass: String,
    pub uv_index: Option<f64>,
    /// Air quality index, 1 (good) to 5 (very poor)
    pub aqi: Option<u8>,
    /// Today's total rain and snow
    pub precipitation_cm: f64,
    pub sun_event: Option<SunEvent>,
    pub moon: MoonPhase,
    /// Next six hours
    pub hourly: Vec<HourlyForecast>,
    /// Next seven days, starting tomorrow
    pub daily: Vec<DailyForecast>,
    pub fetched_at: DateTime<Utc>,
}
