//! Auto-scroll for the day schedule.
//!
//! Plain centering on the current time fails at both ends of the day and
//! when the next events are far from now. The target is instead picked by a
//! fixed order of rules: do not open on a long empty stretch before the next
//! event, keep the last upcoming event on screen, and never lose the
//! current-time marker.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::components::calendar::models::CalendarEvent;
use crate::utils::time::{minutes_since_midnight, MINUTES_PER_DAY};

/// How far ahead of the next event the view may start
pub const LOOKAHEAD_MINUTES: f64 = 120.0;
/// Space kept under the last upcoming event
pub const BOTTOM_PADDING_MINUTES: f64 = 60.0;
/// Closest the current-time marker may get to the bottom edge
pub const MARKER_BOTTOM_MARGIN_MINUTES: f64 = 100.0;
/// Closest the current-time marker may get to the top edge
pub const MARKER_TOP_MARGIN_MINUTES: f64 = 15.0;
/// Automatic scrolling stays off this long after the last manual scroll
pub const SCROLL_QUIET_PERIOD: Duration = Duration::from_secs(10);

/// Size of the schedule pane as reported by the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub container_height: f64,
    pub content_height: f64,
    pub pixels_per_minute: f64,
}

impl ViewportGeometry {
    /// Geometry of a full-day grid at the given scale
    pub fn full_day(container_height: f64, pixels_per_minute: f64) -> Self {
        Self {
            container_height,
            content_height: MINUTES_PER_DAY * pixels_per_minute,
            pixels_per_minute,
        }
    }

    pub fn max_offset(&self) -> f64 {
        (self.content_height - self.container_height).max(0.0)
    }

    /// Clamp an offset into the scrollable range
    pub fn clamp(&self, offset: f64) -> f64 {
        offset.max(0.0).min(self.max_offset())
    }

    /// Pixel position of a time of day, limited to the day grid
    pub fn position(&self, minutes: f64) -> f64 {
        minutes.max(0.0).min(MINUTES_PER_DAY) * self.pixels_per_minute
    }

    fn span(&self, minutes: f64) -> f64 {
        minutes * self.pixels_per_minute
    }
}

/// Scroll offset that keeps now and the next events of `day` in view.
///
/// `events` are the timed events of the viewed day; all-day events are
/// ignored.
pub fn auto_scroll_target<'a>(
    events: impl IntoIterator<Item = &'a CalendarEvent>,
    now: &DateTime<Utc>,
    day: NaiveDate,
    tz: &Tz,
    geometry: &ViewportGeometry,
) -> f64 {
    let height = geometry.container_height;
    let current_time_position = geometry.position(minutes_since_midnight(now, day, tz));

    let mut first_upcoming_start: Option<DateTime<Utc>> = None;
    let mut last_upcoming_end: Option<DateTime<Utc>> = None;
    for (start, end) in events.into_iter().filter_map(CalendarEvent::timed_bounds) {
        if end <= *now {
            continue;
        }
        first_upcoming_start = Some(first_upcoming_start.map_or(start, |s| s.min(start)));
        last_upcoming_end = Some(last_upcoming_end.map_or(end, |e| e.max(end)));
    }

    let (first_start, last_end) = match (first_upcoming_start, last_upcoming_end) {
        (Some(first), Some(last)) => (first, last),
        // Nothing left today: follow the marker down the grid
        _ => return geometry.clamp(current_time_position - height / 2.0),
    };

    let first_upcoming_position = geometry.position(minutes_since_midnight(&first_start, day, tz));
    let earliest_desired =
        (first_upcoming_position - geometry.span(LOOKAHEAD_MINUTES)).max(0.0);
    let centered = (current_time_position - height / 2.0).max(0.0);
    let mut offset = earliest_desired.max(centered);

    let last_upcoming_end_position = geometry.position(minutes_since_midnight(&last_end, day, tz));
    if last_upcoming_end_position > offset + height {
        offset = last_upcoming_end_position + geometry.span(BOTTOM_PADDING_MINUTES) - height;
    }

    // The marker must stay on screen, clear of the bottom edge
    let lowest = current_time_position + geometry.span(MARKER_BOTTOM_MARGIN_MINUTES) - height;
    let highest = current_time_position - geometry.span(MARKER_TOP_MARGIN_MINUTES);
    offset = if lowest <= highest {
        offset.max(lowest).min(highest)
    } else {
        current_time_position - height / 2.0
    };

    geometry.clamp(offset)
}

/// Scroll state of the schedule pane
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewportState {
    /// Last known scroll offset
    pub offset: f64,
    /// Last reported pane size
    pub geometry: Option<ViewportGeometry>,
    /// Last computed automatic target
    pub target: Option<f64>,
    #[serde(skip)]
    last_manual_scroll: Option<Instant>,
}

impl ViewportState {
    pub fn set_geometry(&mut self, geometry: ViewportGeometry) {
        self.geometry = Some(geometry);
    }

    /// Record a scroll made by a person
    pub fn record_manual_scroll(&mut self, offset: f64, at: Instant) {
        self.offset = offset;
        self.last_manual_scroll = Some(at);
    }

    /// Whether a person scrolled within the quiet period
    pub fn is_user_scrolling(&self, at: Instant) -> bool {
        self.last_manual_scroll
            .is_some_and(|last| at.saturating_duration_since(last) < SCROLL_QUIET_PERIOD)
    }

    /// Take an automatic target unless a person is scrolling.
    ///
    /// Returns the offset the pane should animate to.
    pub fn apply_auto_scroll(&mut self, target: f64, at: Instant) -> Option<f64> {
        if self.is_user_scrolling(at) {
            return None;
        }
        self.target = Some(target);
        self.offset = target;
        Some(target)
    }
}
