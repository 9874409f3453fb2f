use super::feed::FeedView;
use crate::components::calendar::models::{CalendarEvent, FetchWindow};
use crate::components::weather::models::WeatherSnapshot;
use crate::layout::PositionedEvent;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which day the schedule pane shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Today,
    Tomorrow,
}

/// Localized strings for the kiosk page
#[derive(Debug, Clone, Serialize)]
pub struct Labels {
    pub all_day: String,
    pub today: String,
    pub tomorrow: String,
    pub tomorrow_at_a_glance: String,
    pub nothing_planned: String,
    pub loading: String,
    pub stale: String,
    pub unavailable: String,
    pub feels_like: String,
    pub humidity: String,
    pub uv_index: String,
    pub air_quality: String,
}

impl Labels {
    pub fn current() -> Self {
        Self {
            all_day: t!("all_day").to_string(),
            today: t!("today").to_string(),
            tomorrow: t!("tomorrow").to_string(),
            tomorrow_at_a_glance: t!("tomorrow_at_a_glance").to_string(),
            nothing_planned: t!("nothing_planned").to_string(),
            loading: t!("status_loading").to_string(),
            stale: t!("status_stale").to_string(),
            unavailable: t!("status_unavailable").to_string(),
            feels_like: t!("feels_like").to_string(),
            humidity: t!("humidity").to_string(),
            uv_index: t!("uv_index").to_string(),
            air_quality: t!("air_quality").to_string(),
        }
    }
}

/// Everything the kiosk page renders, in one response
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub now: DateTime<Utc>,
    /// Local "HH:MM"
    pub clock: String,
    pub today: NaiveDate,
    pub timezone: String,
    pub view: ViewMode,
    /// Day shown in the schedule pane
    pub day: NaiveDate,
    pub all_day: Vec<CalendarEvent>,
    pub positioned: Vec<PositionedEvent>,
    pub tomorrow_at_a_glance: Vec<CalendarEvent>,
    /// Offset the schedule pane should scroll to
    pub scroll_target: Option<f64>,
    pub user_scrolling: bool,
    /// Marker position in minutes since local midnight
    pub current_minute: f64,
    pub pixels_per_minute: f64,
    pub calendar: FeedView<FetchWindow>,
    pub failed_sources: Vec<String>,
    pub weather: FeedView<WeatherSnapshot>,
    pub labels: Labels,
}
