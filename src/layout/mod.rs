//! Schedule layout engine.
//!
//! Pure functions from a set of calendar events and the current time to what
//! the schedule pane shows: lanes for overlapping events, the all-day strip,
//! the "tomorrow at a glance" list and the auto-scroll target.

pub mod classify;
pub mod columns;
pub mod viewport;

pub use classify::{bucket, events_for_day, occurs_on, tomorrow_at_a_glance, DayBucket, DayEvents};
pub use columns::{assign_columns, overlaps, PositionedEvent};
pub use viewport::{auto_scroll_target, ViewportGeometry, ViewportState};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::components::calendar::models::CalendarEvent;

/// Layout of one day, rebuilt whenever the event set or the day changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayLayout {
    pub day: NaiveDate,
    pub all_day: Vec<CalendarEvent>,
    pub positioned: Vec<PositionedEvent>,
}

impl DayLayout {
    pub fn build(events: &[CalendarEvent], day: NaiveDate, tz: &Tz) -> Self {
        let day_events = events_for_day(events, day, tz);

        Self {
            day,
            positioned: assign_columns(&day_events.timed),
            all_day: day_events.all_day,
        }
    }

    /// Scroll target for this day at `now`
    pub fn scroll_target(&self, now: &DateTime<Utc>, tz: &Tz, geometry: &ViewportGeometry) -> f64 {
        auto_scroll_target(
            self.positioned.iter().map(|p| &p.event),
            now,
            self.day,
            tz,
            geometry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_day_layout_build() {
        let tz = chrono_tz::UTC;
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap();
        let events = vec![
            CalendarEvent::all_day("h", "Holiday", day, day + Duration::days(1), 0),
            CalendarEvent::timed("a", "A", at(9, 0), at(10, 0), 0),
            CalendarEvent::timed("b", "B", at(9, 30), at(11, 0), 1),
            CalendarEvent::timed("next", "Next day", at(9, 0) + Duration::days(1), at(10, 0) + Duration::days(1), 0),
        ];

        let layout = DayLayout::build(&events, day, &tz);
        assert_eq!(layout.all_day.len(), 1);
        assert_eq!(layout.positioned.len(), 2);
        assert!(layout.positioned.iter().all(|p| p.total_columns == 2));

        let geometry = ViewportGeometry::full_day(600.0, 1.0);
        let target = layout.scroll_target(&at(9, 45), &tz, &geometry);
        // Two hours ahead of the 09:00 start
        assert_eq!(target, 420.0);
    }
}
