//! Display shell state.
//!
//! The board keeps the last good data of each feed, the view mode, the
//! viewport and the layout cache behind one lock. Timers that change this
//! state (scroll debounce, tomorrow view revert) are owned here and are
//! cancelled on teardown.

pub mod feed;
pub mod view;

pub use feed::{Feed, FeedError, FeedStatus, FeedView};
pub use view::{DashboardView, Labels, ViewMode};

use crate::components::calendar::models::{CalendarEvent, CalendarSnapshot};
use crate::components::weather::models::WeatherSnapshot;
use crate::error::BoardResult;
use crate::layout::{tomorrow_at_a_glance, DayLayout, ViewportGeometry, ViewportState};
use crate::utils::scheduler::SingleShot;
use crate::utils::time::{format_clock, minutes_since_midnight};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// The tomorrow view falls back to today after this long
pub const VIEW_REVERT_DELAY: Duration = Duration::from_secs(30);

/// Layouts derived from one event set on one day
#[derive(Debug, Clone)]
struct LayoutCache {
    today: NaiveDate,
    generation: u64,
    today_layout: DayLayout,
    tomorrow_layout: DayLayout,
    glance: Vec<CalendarEvent>,
}

impl LayoutCache {
    fn build(events: &[CalendarEvent], today: NaiveDate, generation: u64, tz: &Tz) -> Self {
        let tomorrow = today + ChronoDuration::days(1);
        debug!("Rebuilding layout for {} ({} events)", today, events.len());

        Self {
            today,
            generation,
            today_layout: DayLayout::build(events, today, tz),
            tomorrow_layout: DayLayout::build(events, tomorrow, tz),
            glance: tomorrow_at_a_glance(events, tomorrow, tz),
        }
    }
}

/// State behind the board lock
pub struct BoardState {
    weather: Feed<WeatherSnapshot>,
    calendar: Feed<CalendarSnapshot>,
    view: ViewMode,
    viewport: ViewportState,
    layout: Option<LayoutCache>,
    /// Bumped whenever the event set changes
    generation: u64,
    scroll_debounce: SingleShot,
    view_revert: SingleShot,
    torn_down: bool,
}

impl BoardState {
    fn new() -> Self {
        Self {
            weather: Feed::default(),
            calendar: Feed::default(),
            view: ViewMode::Today,
            viewport: ViewportState::default(),
            layout: None,
            generation: 0,
            scroll_debounce: SingleShot::new("scroll debounce"),
            view_revert: SingleShot::new("view revert"),
            torn_down: false,
        }
    }

    fn ensure_layout(&mut self, now: &DateTime<Utc>, tz: &Tz) -> &LayoutCache {
        let today = now.with_timezone(tz).date_naive();
        let cache = match self.layout.take() {
            Some(cache) if cache.today == today && cache.generation == self.generation => cache,
            _ => {
                let events = self
                    .calendar
                    .data()
                    .map(|snapshot| snapshot.events.as_slice())
                    .unwrap_or_default();
                LayoutCache::build(events, today, self.generation, tz)
            }
        };
        self.layout.insert(cache)
    }

    /// Recompute the auto-scroll target of the today view
    fn refresh_scroll(&mut self, now: &DateTime<Utc>, at: Instant, tz: &Tz) -> Option<f64> {
        if self.torn_down || self.view != ViewMode::Today {
            return None;
        }
        let geometry = self.viewport.geometry?;
        let target = self
            .ensure_layout(now, tz)
            .today_layout
            .scroll_target(now, tz, &geometry);
        self.viewport.apply_auto_scroll(target, at)
    }
}

/// Cloneable handle to the board
#[derive(Clone)]
pub struct Board {
    state: Arc<RwLock<BoardState>>,
    tz: Tz,
    pixels_per_minute: f64,
}

impl Board {
    pub fn new(tz: Tz, pixels_per_minute: f64) -> Self {
        Self {
            state: Arc::new(RwLock::new(BoardState::new())),
            tz,
            pixels_per_minute,
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.pixels_per_minute
    }

    /// Store the outcome of a calendar poll
    pub async fn update_calendar(&self, result: BoardResult<CalendarSnapshot>) {
        self.update_calendar_at(result, Utc::now(), Instant::now()).await;
    }

    pub async fn update_calendar_at(
        &self,
        result: BoardResult<CalendarSnapshot>,
        now: DateTime<Utc>,
        at: Instant,
    ) {
        let mut state = self.state.write().await;
        if state.torn_down {
            return;
        }

        match result {
            Ok(snapshot) => {
                let changed = state
                    .calendar
                    .data()
                    .map_or(true, |previous| previous.events != snapshot.events);
                info!(
                    "Calendar refreshed: {} events, {} failed sources",
                    snapshot.events.len(),
                    snapshot.failed_sources.len()
                );
                state.calendar.record_success(snapshot, now);
                if changed {
                    state.generation += 1;
                    state.refresh_scroll(&now, at, &self.tz);
                }
            }
            Err(e) => {
                error!("Calendar refresh failed: {}", e);
                state.calendar.record_failure(&e, now);
            }
        }
    }

    /// Store the outcome of a weather poll
    pub async fn update_weather(&self, result: BoardResult<WeatherSnapshot>) {
        let now = Utc::now();
        let mut state = self.state.write().await;
        if state.torn_down {
            return;
        }

        match result {
            Ok(snapshot) => {
                info!("Weather refreshed: {:.1}°C", snapshot.temperature);
                state.weather.record_success(snapshot, now);
            }
            Err(e) => {
                error!("Weather refresh failed: {}", e);
                state.weather.record_failure(&e, now);
            }
        }
    }

    /// Minute tick: follow the day change and recompute the scroll target
    pub async fn tick(&self) -> Option<f64> {
        self.tick_at(Utc::now(), Instant::now()).await
    }

    pub async fn tick_at(&self, now: DateTime<Utc>, at: Instant) -> Option<f64> {
        let mut state = self.state.write().await;
        state.refresh_scroll(&now, at, &self.tz)
    }

    /// Pane size reported by the page
    pub async fn set_geometry(&self, geometry: ViewportGeometry) -> Option<f64> {
        let mut state = self.state.write().await;
        state.viewport.set_geometry(geometry);
        state.refresh_scroll(&Utc::now(), Instant::now(), &self.tz)
    }

    /// A person scrolled the pane; automatic scrolling pauses until they stop
    pub async fn manual_scroll(&self, offset: f64) {
        let mut state = self.state.write().await;
        if state.torn_down {
            return;
        }
        state.viewport.record_manual_scroll(offset, Instant::now());

        let board = self.clone();
        state
            .scroll_debounce
            .restart(crate::layout::viewport::SCROLL_QUIET_PERIOD, move || async move {
                debug!("Manual scrolling settled");
                board.tick().await;
            });
    }

    /// Show tomorrow; re-triggering restarts the revert timer
    pub async fn show_tomorrow(&self) {
        let mut state = self.state.write().await;
        if state.torn_down {
            return;
        }
        state.view = ViewMode::Tomorrow;

        let board = self.clone();
        state.view_revert.restart(VIEW_REVERT_DELAY, move || async move {
            debug!("Reverting to today view");
            board.revert_to_today().await;
        });
    }

    /// Back to today, cancelling a pending revert
    pub async fn show_today(&self) {
        let mut state = self.state.write().await;
        state.view_revert.cancel();
        state.view = ViewMode::Today;
        state.refresh_scroll(&Utc::now(), Instant::now(), &self.tz);
    }

    /// Runs inside the revert timer, so it must not cancel it
    async fn revert_to_today(&self) {
        let mut state = self.state.write().await;
        state.view = ViewMode::Today;
        state.refresh_scroll(&Utc::now(), Instant::now(), &self.tz);
    }

    pub async fn view_mode(&self) -> ViewMode {
        self.state.read().await.view
    }

    pub async fn is_revert_pending(&self) -> bool {
        self.state.read().await.view_revert.is_pending()
    }

    pub async fn viewport(&self) -> ViewportState {
        self.state.read().await.viewport.clone()
    }

    pub async fn dashboard(&self) -> DashboardView {
        self.dashboard_at(Utc::now(), Instant::now()).await
    }

    pub async fn dashboard_at(&self, now: DateTime<Utc>, at: Instant) -> DashboardView {
        let tz = self.tz;
        let mut state = self.state.write().await;
        let view = state.view;
        let layout = state.ensure_layout(&now, &tz).clone();

        let active = match view {
            ViewMode::Today => layout.today_layout,
            ViewMode::Tomorrow => layout.tomorrow_layout,
        };
        let scroll_target = match view {
            ViewMode::Today => state.viewport.target,
            ViewMode::Tomorrow => None,
        };

        DashboardView {
            now,
            clock: format_clock(&now, &tz),
            today: layout.today,
            timezone: tz.name().to_string(),
            view,
            day: active.day,
            all_day: active.all_day,
            positioned: active.positioned,
            tomorrow_at_a_glance: layout.glance,
            scroll_target,
            user_scrolling: state.viewport.is_user_scrolling(at),
            current_minute: minutes_since_midnight(&now, layout.today, &tz),
            pixels_per_minute: self.pixels_per_minute,
            calendar: state.calendar.view_with(|snapshot| snapshot.window.clone()),
            failed_sources: state
                .calendar
                .data()
                .map(|snapshot| snapshot.failed_sources.clone())
                .unwrap_or_default(),
            weather: state.weather.view_with(|snapshot| snapshot.clone()),
            labels: Labels::current(),
        }
    }

    /// Cancel every timer; later updates are ignored
    pub async fn teardown(&self) {
        let mut state = self.state.write().await;
        state.torn_down = true;
        state.scroll_debounce.cancel();
        state.view_revert.cancel();
        info!("Board torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar::models::FetchWindow;
    use crate::error::feed_error;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn snapshot(events: Vec<CalendarEvent>) -> CalendarSnapshot {
        CalendarSnapshot {
            events,
            window: FetchWindow {
                week_start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                week_end: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                time_min: Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(),
                time_max: Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap(),
            },
            fetched_at: at(9, 0),
            failed_sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_good_events() {
        let board = Board::new(chrono_tz::UTC, 1.0);
        let events = vec![CalendarEvent::timed("a", "A", at(9, 0), at(10, 0), 0)];
        let start = Instant::now();

        board.update_calendar_at(Ok(snapshot(events)), at(8, 0), start).await;
        board
            .update_calendar_at(Err(feed_error("offline")), at(8, 1), start)
            .await;

        let view = board.dashboard_at(at(8, 1), start).await;
        assert_eq!(view.calendar.status, FeedStatus::Stale);
        assert_eq!(view.positioned.len(), 1);
        assert_eq!(
            view.calendar.error.map(|e| e.code),
            Some("statusboard::feed".to_string())
        );
    }

    #[tokio::test]
    async fn test_layout_follows_day_change() {
        let board = Board::new(chrono_tz::UTC, 1.0);
        let tomorrow_event = CalendarEvent::timed(
            "b",
            "B",
            at(9, 0) + ChronoDuration::days(1),
            at(10, 0) + ChronoDuration::days(1),
            0,
        );
        let start = Instant::now();
        board
            .update_calendar_at(Ok(snapshot(vec![tomorrow_event])), at(8, 0), start)
            .await;

        let view = board.dashboard_at(at(23, 59), start).await;
        assert!(view.positioned.is_empty());
        assert_eq!(view.tomorrow_at_a_glance.len(), 1);

        // Past midnight the same event set lays out as today
        let view = board.dashboard_at(at(0, 1) + ChronoDuration::days(1), start).await;
        assert_eq!(view.positioned.len(), 1);
        assert!(view.tomorrow_at_a_glance.is_empty());
    }

    #[tokio::test]
    async fn test_tick_waits_for_geometry() {
        let board = Board::new(chrono_tz::UTC, 1.0);
        assert_eq!(board.tick_at(at(12, 0), Instant::now()).await, None);
    }

    #[tokio::test]
    async fn test_tomorrow_view_suppresses_auto_scroll() {
        let board = Board::new(chrono_tz::UTC, 1.0);
        board
            .set_geometry(ViewportGeometry::full_day(600.0, 1.0))
            .await;

        board.show_tomorrow().await;
        assert_eq!(board.view_mode().await, ViewMode::Tomorrow);
        assert!(board.is_revert_pending().await);
        assert_eq!(board.tick_at(at(12, 0), Instant::now()).await, None);

        board.show_today().await;
        assert_eq!(board.view_mode().await, ViewMode::Today);
        assert!(!board.is_revert_pending().await);
        assert_eq!(board.tick_at(at(12, 0), Instant::now()).await, Some(420.0));
    }

    #[tokio::test]
    async fn test_teardown_ignores_late_updates() {
        let board = Board::new(chrono_tz::UTC, 1.0);
        board.show_tomorrow().await;
        board.teardown().await;
        assert!(!board.is_revert_pending().await);

        board
            .update_calendar_at(Ok(snapshot(Vec::new())), at(8, 0), Instant::now())
            .await;
        let view = board.dashboard_at(at(8, 0), Instant::now()).await;
        assert_eq!(view.calendar.status, FeedStatus::Loading);
    }
}
