//! OpenWeatherMap-compatible client.
//!
//! Three calls per refresh: current conditions, the one-call forecast and
//! air pollution. Only the last one may fail without failing the refresh.

use super::astro::{moon_phase, next_sun_event};
use super::models::{Condition, DailyForecast, HourlyForecast, WeatherSnapshot};
use crate::config::Config;
use crate::error::{missing_credentials, weather_error, BoardResult};
use crate::utils::time::format_clock;
use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

const HOURLY_COUNT: usize = 6;
const DAILY_COUNT: usize = 7;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    pub id: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub weather: Vec<ApiCondition>,
    pub main: CurrentMain,
    #[serde(default)]
    pub wind: Wind,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneCallCurrent {
    pub uvi: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiHourly {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    pub temp: f64,
    #[serde(default)]
    pub pop: f64,
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyTemperature {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDaily {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub sunrise: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub sunset: DateTime<Utc>,
    pub temp: DailyTemperature,
    #[serde(default)]
    pub pop: f64,
    /// Millimetres
    #[serde(default)]
    pub rain: f64,
    /// Millimetres
    #[serde(default)]
    pub snow: f64,
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneCallResponse {
    #[serde(default)]
    pub current: OneCallCurrent,
    #[serde(default)]
    pub hourly: Vec<ApiHourly>,
    pub daily: Vec<ApiDaily>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirQualityMain {
    pub aqi: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirQualityEntry {
    pub main: AirQualityMain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirPollutionResponse {
    pub list: Vec<AirQualityEntry>,
}

/// Client for one forecast location
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    lat: f64,
    lon: f64,
}

impl WeatherClient {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: Option<String>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key,
            lat,
            lon,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            config.weather_api_base.clone(),
            config.weather_api_key.clone(),
            config.weather_lat,
            config.weather_lon,
        )
    }

    /// Fetch everything and reshape it for the board
    pub async fn fetch(&self, tz: &Tz) -> BoardResult<WeatherSnapshot> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_credentials("WEATHER_API_KEY"))?;

        let (current, forecast, air) = tokio::join!(
            self.get::<CurrentResponse>("/data/2.5/weather", api_key, &[]),
            self.get::<OneCallResponse>("/data/3.0/onecall", api_key, &[("exclude", "minutely,alerts")]),
            self.get::<AirPollutionResponse>("/data/2.5/air_pollution", api_key, &[]),
        );

        let aqi = match air {
            Ok(air) => air.list.first().map(|entry| entry.main.aqi),
            Err(e) => {
                warn!("Air quality unavailable: {}", e);
                None
            }
        };

        build_snapshot(&current?, &forecast?, aqi, Utc::now(), tz)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &str,
        extra: &[(&str, &str)],
    ) -> BoardResult<T> {
        let mut url = Url::parse(&self.api_base)
            .and_then(|base| base.join(path))
            .map_err(|e| weather_error(&format!("Failed to parse URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("lat", &self.lat.to_string())
            .append_pair("lon", &self.lon.to_string())
            .append_pair("units", "metric")
            .append_pair("appid", api_key)
            .extend_pairs(extra);

        debug!("Requesting {}", path);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| weather_error(&format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(weather_error(&format!(
                "Request to {} failed: HTTP {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| weather_error(&format!("Failed to parse {} response: {}", path, e)))
    }
}

/// Reshape provider responses into a snapshot
pub fn build_snapshot(
    current: &CurrentResponse,
    forecast: &OneCallResponse,
    aqi: Option<u8>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> BoardResult<WeatherSnapshot> {
    let today = forecast
        .daily
        .first()
        .ok_or_else(|| weather_error("Forecast has no daily entries"))?;

    let hourly = forecast
        .hourly
        .iter()
        .filter(|hour| hour.dt > now)
        .take(HOURLY_COUNT)
        .map(|hour| HourlyForecast {
            at: hour.dt,
            label: format_clock(&hour.dt, tz),
            temperature: hour.temp,
            condition: condition(&hour.weather),
            precipitation_probability: percent(hour.pop),
        })
        .collect();

    let daily = forecast
        .daily
        .iter()
        .skip(1)
        .take(DAILY_COUNT)
        .map(|day| {
            let date = day.dt.with_timezone(tz).date_naive();
            DailyForecast {
                date,
                weekday: weekday_label(date.weekday()),
                high: day.temp.max,
                low: day.temp.min,
                condition: condition(&day.weather),
                precipitation_probability: percent(day.pop),
            }
        })
        .collect();

    Ok(WeatherSnapshot {
        temperature: current.main.temp,
        feels_like: current.main.feels_like,
        high: today.temp.max,
        low: today.temp.min,
        condition: condition(&current.weather),
        humidity: current.main.humidity,
        wind_speed_kmh: current.wind.speed * 3.6,
        wind_direction_deg: current.wind.deg,
        wind_compass: compass_point(current.wind.deg).to_string(),
        uv_index: forecast.current.uvi,
        aqi,
        precipitation_cm: (today.rain + today.snow) / 10.0,
        sun_event: next_sun_event(
            &now,
            today.sunrise,
            today.sunset,
            forecast.daily.get(1).map(|d| d.sunrise),
            tz,
        ),
        moon: moon_phase(&now),
        hourly,
        daily,
        fetched_at: now,
    })
}

/// 16-point compass label for a bearing in degrees
pub fn compass_point(degrees: f64) -> &'static str {
    let index = (degrees.rem_euclid(360.0) / 22.5 + 0.5).floor() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

fn condition(weather: &[ApiCondition]) -> Condition {
    weather
        .first()
        .map(|w| Condition {
            code: w.id,
            icon: w.icon.clone(),
            description: w.description.clone(),
        })
        .unwrap_or_else(|| Condition {
            code: 0,
            icon: String::new(),
            description: String::new(),
        })
}

fn percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

fn weekday_label(weekday: Weekday) -> String {
    match weekday {
        Weekday::Mon => t!("weekday_mon"),
        Weekday::Tue => t!("weekday_tue"),
        Weekday::Wed => t!("weekday_wed"),
        Weekday::Thu => t!("weekday_thu"),
        Weekday::Fri => t!("weekday_fri"),
        Weekday::Sat => t!("weekday_sat"),
        Weekday::Sun => t!("weekday_sun"),
    }
    .to_string()
}
