use super::models::{display_title, CalendarEvent, FetchWindow};
use super::source::EventSource;
use super::token::TokenManager;
use crate::error::{google_calendar_error, BoardResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Upper bound on result pages fetched per poll
const MAX_PAGES: usize = 10;

/// One Google calendar
pub struct GoogleCalendarSource {
    calendar_id: String,
    api_base: String,
    token_manager: TokenManager,
    client: Client,
}

impl GoogleCalendarSource {
    pub fn new(
        calendar_id: impl Into<String>,
        api_base: impl Into<String>,
        token_manager: TokenManager,
        client: Client,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            api_base: api_base.into(),
            token_manager,
            client,
        }
    }

    fn events_url(&self, window: &FetchWindow, page_token: Option<&str>) -> BoardResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| google_calendar_error("API base URL cannot have a path"))?
            .pop_if_empty()
            .extend(["calendar", "v3", "calendars", &self.calendar_id, "events"]);

        url.query_pairs_mut()
            .append_pair("timeMin", &window.time_min.to_rfc3339())
            .append_pair("timeMax", &window.time_max.to_rfc3339())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }

        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> BoardResult<Value> {
        let access_token = self.token_manager.get_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.token_manager.invalidate().await;
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))
    }
}

#[async_trait]
impl EventSource for GoogleCalendarSource {
    fn name(&self) -> &str {
        &self.calendar_id
    }

    async fn fetch(
        &self,
        source_index: usize,
        window: &FetchWindow,
        tz: &Tz,
    ) -> BoardResult<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let url = self.events_url(window, page_token.as_deref())?;
            let page = self.fetch_page(url).await?;
            events.extend(parse_events(&page, source_index)?);

            page_token = page
                .get("nextPageToken")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string());
            if page_token.is_none() {
                break;
            }
        }

        if page_token.is_some() {
            warn!("Calendar {} has more than {} pages of events", self.calendar_id, MAX_PAGES);
        }

        events.retain(|event| window.contains(event, tz));
        debug!("Fetched {} events from {}", events.len(), self.calendar_id);
        Ok(events)
    }
}

/// Convert an events list response into calendar events.
///
/// Cancelled events and items without a usable start are skipped.
pub fn parse_events(response: &Value, source_index: usize) -> BoardResult<Vec<CalendarEvent>> {
    let items = response
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| google_calendar_error("No items in response"))?;

    Ok(items
        .iter()
        .filter(|item| item.get("status").and_then(|s| s.as_str()) != Some("cancelled"))
        .filter_map(|item| {
            let event = parse_event(item, source_index);
            if event.is_none() {
                warn!("Skipping calendar item without a valid start: {:?}", item.get("id"));
            }
            event
        })
        .collect())
}

fn parse_event(item: &Value, source_index: usize) -> Option<CalendarEvent> {
    let id = item.get("id").and_then(|id| id.as_str()).unwrap_or_default();
    let title = display_title(item.get("summary").and_then(|s| s.as_str()));
    let text = |key: &str| item.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());

    let start = item.get("start")?;
    let end = item.get("end");
    let field = |value: Option<&Value>, key: &str| -> Option<String> {
        value
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    let event = if let Some(start_date) = field(Some(start), "date") {
        let start_date = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d").ok()?;
        let end_date = field(end, "date")
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            .unwrap_or(start_date + Duration::days(1));
        CalendarEvent::all_day(id, title, start_date, end_date, source_index)
    } else {
        let start_time = parse_date_time(&field(Some(start), "dateTime")?)?;
        let end_time = field(end, "dateTime")
            .and_then(|d| parse_date_time(&d))
            .unwrap_or(start_time);
        CalendarEvent::timed(id, title, start_time, end_time, source_index)
    };

    Some(
        event
            .with_location(text("location"))
            .with_description(text("description")),
    )
}

fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar::models::EventSpan;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_events_mixed_kinds() {
        let response = json!({
            "items": [
                {
                    "id": "holiday",
                    "summary": "Independence Day",
                    "start": {"date": "2024-12-06"},
                    "end": {"date": "2024-12-07"}
                },
                {
                    "id": "standup",
                    "summary": "Standup",
                    "location": "Room 1",
                    "start": {"dateTime": "2024-12-05T09:00:00+02:00"},
                    "end": {"dateTime": "2024-12-05T09:15:00+02:00"}
                },
                {
                    "id": "gone",
                    "status": "cancelled",
                    "start": {"dateTime": "2024-12-05T10:00:00Z"}
                },
                {
                    "id": "nameless",
                    "start": {"dateTime": "2024-12-05T12:00:00Z"},
                    "end": {"dateTime": "2024-12-05T13:00:00Z"}
                },
                {"id": "broken", "start": {}}
            ]
        });

        let events = parse_events(&response, 2).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["holiday", "standup", "nameless"]);

        assert_eq!(
            events[0].span,
            EventSpan::AllDay {
                start: NaiveDate::from_ymd_opt(2024, 12, 6).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 12, 7).unwrap(),
            }
        );
        assert_eq!(
            events[1].timed_bounds(),
            Some((
                Utc.with_ymd_and_hms(2024, 12, 5, 7, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 12, 5, 7, 15, 0).unwrap(),
            ))
        );
        assert_eq!(events[1].location.as_deref(), Some("Room 1"));
        assert_eq!(events[2].title, "Untitled");
        assert!(events.iter().all(|e| e.source_index == 2));
    }

    #[test]
    fn test_parse_events_requires_items() {
        assert!(parse_events(&json!({"error": "nope"}), 0).is_err());
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let source = GoogleCalendarSource::new(
            "family#holiday@group.v.calendar.google.com",
            "https://www.googleapis.com",
            TokenManager::new(Default::default(), "http://localhost/token", Client::new()),
            Client::new(),
        );
        let window = FetchWindow {
            week_start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            time_min: Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(),
            time_max: Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap(),
        };

        let url = source.events_url(&window, Some("next")).unwrap();
        assert!(url
            .path()
            .starts_with("/calendar/v3/calendars/family%23holiday@group.v.calendar.google.com/events"));
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("singleEvents".to_string(), "true".to_string())));
        assert!(query.contains(&("pageToken".to_string(), "next".to_string())));
    }
}
