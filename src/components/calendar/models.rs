use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// When an event happens.
///
/// All-day spans are calendar dates with an exclusive end and are never
/// converted through an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSpan {
    AllDay { start: NaiveDate, end: NaiveDate },
    Timed { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// Calendar event shared by every source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub span: EventSpan,
    pub location: Option<String>,
    pub description: Option<String>,
    pub source_index: usize,
}

/// Title to display for a raw summary, with a placeholder for blanks
pub fn display_title(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => t!("event_untitled").to_string(),
    }
}

impl CalendarEvent {
    /// Timed event; an end before the start is collapsed onto the start
    pub fn timed(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            span: EventSpan::Timed {
                start,
                end: end.max(start),
            },
            location: None,
            description: None,
            source_index,
        }
    }

    /// All-day event covering `start..end` (end exclusive)
    pub fn all_day(
        id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        source_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            span: EventSpan::AllDay {
                start,
                end: end.max(start),
            },
            location: None,
            description: None,
            source_index,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.span, EventSpan::AllDay { .. })
    }

    /// Start and end instants of a timed event
    pub fn timed_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self.span {
            EventSpan::Timed { start, end } => Some((start, end)),
            EventSpan::AllDay { .. } => None,
        }
    }

    pub fn duration(&self) -> Duration {
        match self.span {
            EventSpan::Timed { start, end } => end - start,
            EventSpan::AllDay { start, end } => Duration::days((end - start).num_days().max(1)),
        }
    }

    /// Local wall-clock start; all-day events start at local midnight
    pub fn local_start(&self, tz: &Tz) -> NaiveDateTime {
        match self.span {
            EventSpan::Timed { start, .. } => start.with_timezone(tz).naive_local(),
            EventSpan::AllDay { start, .. } => start.and_time(NaiveTime::MIN),
        }
    }

    /// Display order: start time, all-day before timed, then source and id
    pub fn display_order(&self, other: &Self, tz: &Tz) -> Ordering {
        self.local_start(tz)
            .cmp(&other.local_start(tz))
            .then_with(|| other.is_all_day().cmp(&self.is_all_day()))
            .then_with(|| self.source_index.cmp(&other.source_index))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Range that was requested from the sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    /// Monday of the current week
    pub week_start: NaiveDate,
    /// Sunday of the current week
    pub week_end: NaiveDate,
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl FetchWindow {
    /// Whether an event intersects the window
    pub fn contains(&self, event: &CalendarEvent, tz: &Tz) -> bool {
        match event.span {
            EventSpan::Timed { start, end } => {
                start < self.time_max && (end > self.time_min || (start == end && start >= self.time_min))
            }
            EventSpan::AllDay { start, end } => {
                let min_day = self.time_min.with_timezone(tz).date_naive();
                let max_day = self.time_max.with_timezone(tz).date_naive();
                start < max_day && (end > min_day || (start == end && start >= min_day))
            }
        }
    }
}

/// Result of one calendar poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    /// Events of every source that answered, ordered by start
    pub events: Vec<CalendarEvent>,
    pub window: FetchWindow,
    pub fetched_at: DateTime<Utc>,
    /// Names of sources that failed this cycle
    pub failed_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_display_title_placeholder() {
        assert_eq!(display_title(Some("Standup")), "Standup");
        assert_eq!(display_title(Some("   ")), "Untitled");
        assert_eq!(display_title(None), "Untitled");
    }

    #[test]
    fn test_timed_end_never_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        let event = CalendarEvent::timed("a", "A", start, start - Duration::hours(1), 0);
        assert_eq!(event.timed_bounds(), Some((start, start)));
        assert_eq!(event.duration(), Duration::zero());
    }

    #[test]
    fn test_display_order_puts_all_day_first() {
        let tz = chrono_tz::UTC;
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let all_day = CalendarEvent::all_day("b", "Holiday", day, day.succ_opt().unwrap(), 1);
        let midnight = CalendarEvent::timed(
            "a",
            "Night shift",
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap(),
            0,
        );
        assert_eq!(all_day.display_order(&midnight, &tz), Ordering::Less);
    }

    #[test]
    fn test_blank_location_dropped() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let event = CalendarEvent::all_day("a", "A", day, day, 0)
            .with_location(Some(" ".to_string()))
            .with_description(Some("notes".to_string()));
        assert_eq!(event.location, None);
        assert_eq!(event.description.as_deref(), Some("notes"));
    }
}
