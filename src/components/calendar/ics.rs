//! Subscription calendar feeds (iCalendar text).
//!
//! Only the parts a wall board needs are read: VEVENT components with their
//! start, end or duration, summary, location and description. Recurrence
//! rules are not expanded; only the first occurrence shows up.

use super::models::{display_title, CalendarEvent, FetchWindow};
use super::source::EventSource;
use crate::error::{feed_error, BoardResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use std::str::FromStr;
use tracing::{debug, warn};

/// A subscribed feed URL
pub struct IcsFeedSource {
    url: String,
    client: Client,
}

impl IcsFeedSource {
    /// `webcal://` links are fetched over https
    pub fn new(url: &str, client: Client) -> Self {
        let url = match url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => url.to_string(),
        };
        Self { url, client }
    }
}

#[async_trait]
impl EventSource for IcsFeedSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(
        &self,
        source_index: usize,
        window: &FetchWindow,
        tz: &Tz,
    ) -> BoardResult<Vec<CalendarEvent>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| feed_error(&format!("Failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(feed_error(&format!(
                "Failed to fetch feed: HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| feed_error(&format!("Failed to read feed: {}", e)))?;

        if !body.trim_start().starts_with("BEGIN:VCALENDAR") {
            return Err(feed_error("Response is not an iCalendar document"));
        }

        let mut events = parse_ics(&body, source_index, tz);
        events.retain(|event| window.contains(event, tz));
        debug!("Feed {} has {} events in window", self.url, events.len());
        Ok(events)
    }
}

#[derive(Debug)]
struct Property {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl Property {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// When a DTSTART/DTEND value points
#[derive(Debug, Clone, Copy, PartialEq)]
enum IcsTime {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

/// Parse every event of an iCalendar document.
///
/// Floating times and unknown TZIDs are read in `tz`. Broken events are
/// skipped with a warning.
pub fn parse_ics(text: &str, source_index: usize, tz: &Tz) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut current: Option<Vec<Property>> = None;
    // Depth of components nested inside the event, e.g. VALARM
    let mut nested = 0usize;

    for line in unfold(text) {
        let Some(property) = parse_line(&line) else {
            continue;
        };

        let (name, value) = (property.name.clone(), property.value.to_ascii_uppercase());

        match (name.as_str(), value.trim()) {
            ("BEGIN", "VEVENT") if current.is_none() => {
                current = Some(Vec::new());
                nested = 0;
            }
            ("END", "VEVENT") if nested == 0 => {
                if let Some(properties) = current.take() {
                    let index = events.len();
                    match build_event(&properties, source_index, index, tz) {
                        Ok(Some(event)) => events.push(event),
                        Ok(None) => {}
                        Err(reason) => warn!("Skipping feed event: {}", reason),
                    }
                }
            }
            ("BEGIN", _) if current.is_some() => nested += 1,
            ("END", _) if current.is_some() => nested = nested.saturating_sub(1),
            _ => {
                if let Some(properties) = current.as_mut() {
                    if nested == 0 {
                        properties.push(property);
                    }
                }
            }
        }
    }

    events
}

/// Join folded continuation lines
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for raw in text.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.is_empty() {
            lines.push(raw.to_string());
        }
    }

    lines
}

/// Split `NAME;PARAM=VALUE:value`, honoring quoted parameter values
fn parse_line(line: &str) -> Option<Property> {
    let mut in_quotes = false;
    let mut split_at = None;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                split_at = Some(i);
                break;
            }
            _ => {}
        }
    }

    let split_at = split_at?;
    let (head, value) = (&line[..split_at], &line[split_at + 1..]);
    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();

    let params = parts
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_ascii_uppercase(), value.trim_matches('"').to_string()))
        })
        .collect();

    Some(Property {
        name,
        params,
        value: value.to_string(),
    })
}

fn build_event(
    properties: &[Property],
    source_index: usize,
    index: usize,
    tz: &Tz,
) -> Result<Option<CalendarEvent>, String> {
    let get = |name: &str| properties.iter().find(|p| p.name == name);

    if get("STATUS").is_some_and(|p| p.value.trim().eq_ignore_ascii_case("CANCELLED")) {
        return Ok(None);
    }

    let start_property = get("DTSTART").ok_or("missing DTSTART")?;
    let start = parse_time(start_property, tz)?;

    let end = match (get("DTEND"), get("DURATION")) {
        (Some(end), _) => Some(parse_time(end, tz)?),
        (None, Some(duration)) => {
            let duration = parse_duration(&duration.value)
                .ok_or_else(|| format!("bad DURATION {}", duration.value))?;
            Some(match start {
                IcsTime::Date(date) => IcsTime::Date(date + Duration::days(duration.num_days().max(1))),
                IcsTime::Instant(instant) => IcsTime::Instant(instant + duration),
            })
        }
        (None, None) => None,
    };

    let mut id = get("UID")
        .map(|p| p.value.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| format!("feed-{}-{}", source_index, index));
    if let Some(recurrence) = get("RECURRENCE-ID") {
        id = format!("{}@{}", id, recurrence.value.trim());
    }

    let title = display_title(get("SUMMARY").map(|p| unescape(&p.value)).as_deref());
    let text = |name: &str| get(name).map(|p| unescape(&p.value));

    let event = match (start, end) {
        (IcsTime::Date(start), Some(IcsTime::Date(end))) => {
            CalendarEvent::all_day(id, title, start, end, source_index)
        }
        (IcsTime::Date(start), None) => {
            CalendarEvent::all_day(id, title, start, start + Duration::days(1), source_index)
        }
        (IcsTime::Instant(start), Some(IcsTime::Instant(end))) => {
            CalendarEvent::timed(id, title, start, end, source_index)
        }
        (IcsTime::Instant(start), None) => CalendarEvent::timed(id, title, start, start, source_index),
        _ => return Err(format!("event {} mixes dates and times", id)),
    };

    Ok(Some(
        event
            .with_location(text("LOCATION"))
            .with_description(text("DESCRIPTION")),
    ))
}

fn parse_time(property: &Property, tz: &Tz) -> Result<IcsTime, String> {
    let value = property.value.trim();

    if property.param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE")) || value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(IcsTime::Date)
            .map_err(|_| format!("bad date {}", value));
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .map_err(|_| format!("bad time {}", value))?;
        return Ok(IcsTime::Instant(Utc.from_utc_datetime(&naive)));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|_| format!("bad time {}", value))?;

    let zone = match property.param("TZID") {
        Some(tzid) => Tz::from_str(tzid).unwrap_or_else(|_| {
            debug!("Unknown TZID {}, using {}", tzid, tz.name());
            *tz
        }),
        None => *tz,
    };

    Ok(IcsTime::Instant(local_to_utc(&naive, &zone)))
}

/// Resolve a wall-clock time; times in a DST gap move forward an hour
fn local_to_utc(naive: &NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(naive))
}

/// Parse an RFC 5545 duration such as `PT1H30M` or `P1W`
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let value = value.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;

    for c in value.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let amount: i64 = number.parse().ok()?;
                number.clear();
                total += match (unit, in_time) {
                    ('W', false) => Duration::weeks(amount),
                    ('D', false) => Duration::days(amount),
                    ('H', true) => Duration::hours(amount),
                    ('M', true) => Duration::minutes(amount),
                    ('S', true) => Duration::seconds(amount),
                    _ => return None,
                };
            }
        }
    }

    if !number.is_empty() || negative {
        return None;
    }
    Some(total)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
