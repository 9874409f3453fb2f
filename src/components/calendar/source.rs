use super::models::{CalendarSnapshot, FetchWindow};
use crate::components::calendar::models::CalendarEvent;
use crate::error::{feed_error, other_error, BoardResult};
use crate::utils::time::{local_midnight, week_bounds};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Days fetched from Monday on; one more than a week so Sunday has a tomorrow
const FETCH_DAYS: i64 = 8;

/// A configured calendar or feed
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Name used in logs and in the list of failed sources
    fn name(&self) -> &str;

    /// Fetch the events intersecting `window`, tagged with `source_index`
    async fn fetch(
        &self,
        source_index: usize,
        window: &FetchWindow,
        tz: &Tz,
    ) -> BoardResult<Vec<CalendarEvent>>;
}

/// Window for the current local week
pub fn fetch_window(now: &DateTime<Utc>, tz: &Tz) -> FetchWindow {
    let today = now.with_timezone(tz).date_naive();
    let (week_start, week_end) = week_bounds(today);

    FetchWindow {
        week_start,
        week_end,
        time_min: local_midnight(week_start, tz),
        time_max: local_midnight(week_start + Duration::days(FETCH_DAYS), tz),
    }
}

/// Fetch every source in parallel and merge the results.
///
/// A source that fails or times out contributes nothing. Only when every
/// configured source fails is the whole poll an error.
pub async fn fetch_all(
    sources: &[Arc<dyn EventSource>],
    window: &FetchWindow,
    tz: &Tz,
    timeout: std::time::Duration,
) -> BoardResult<CalendarSnapshot> {
    let fetches = sources.iter().enumerate().map(|(index, source)| async move {
        let result = match tokio::time::timeout(timeout, source.fetch(index, window, tz)).await {
            Ok(result) => result,
            Err(_) => Err(feed_error(&format!(
                "{} timed out after {}s",
                source.name(),
                timeout.as_secs()
            ))),
        };
        (index, source.name().to_string(), result)
    });

    let mut events = Vec::new();
    let mut failed_sources = Vec::new();
    let mut last_error = None;

    for (index, name, result) in join_all(fetches).await {
        match result {
            Ok(mut source_events) => {
                debug!("Source {} returned {} events", name, source_events.len());
                for event in &mut source_events {
                    event.source_index = index;
                }
                events.extend(source_events);
            }
            Err(e) => {
                warn!("Calendar source {} failed: {}", name, e);
                failed_sources.push(name);
                last_error = Some(e);
            }
        }
    }

    if !sources.is_empty() && failed_sources.len() == sources.len() {
        return Err(last_error.unwrap_or_else(|| other_error("All calendar sources failed")));
    }

    events.sort_by(|a, b| a.display_order(b, tz));

    Ok(CalendarSnapshot {
        events,
        window: window.clone(),
        fetched_at: Utc::now(),
        failed_sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_fetch_window_covers_week_and_next_monday() {
        let tz = chrono_tz::Europe::Helsinki;
        // Sunday evening local time
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let window = fetch_window(&now, &tz);

        assert_eq!(window.week_start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(window.week_end, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(window.time_min, Utc.with_ymd_and_hms(2024, 3, 3, 22, 0, 0).unwrap());
        // Through the end of Monday the 11th
        assert_eq!(window.time_max, Utc.with_ymd_and_hms(2024, 3, 11, 22, 0, 0).unwrap());
    }
}
