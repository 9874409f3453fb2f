use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::components::calendar::models::{CalendarEvent, EventSpan};

/// Which day an event belongs to, relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBucket {
    Today,
    Tomorrow,
    Neither,
}

/// Whether an event belongs on the given calendar date.
///
/// All-day events compare calendar dates only, so a holiday on 2024-03-10
/// shows on 2024-03-10 whatever the viewer's UTC offset. Timed events belong
/// to the local date of their start.
pub fn occurs_on(event: &CalendarEvent, day: NaiveDate, tz: &Tz) -> bool {
    match event.span {
        EventSpan::AllDay { start, end } if end <= start => day == start,
        EventSpan::AllDay { start, end } => start <= day && day < end,
        EventSpan::Timed { start, .. } => start.with_timezone(tz).date_naive() == day,
    }
}

/// Bucket of an event; multi-day all-day events covering both days count as today
pub fn bucket(event: &CalendarEvent, today: NaiveDate, tz: &Tz) -> DayBucket {
    if occurs_on(event, today, tz) {
        DayBucket::Today
    } else if today.succ_opt().is_some_and(|tomorrow| occurs_on(event, tomorrow, tz)) {
        DayBucket::Tomorrow
    } else {
        DayBucket::Neither
    }
}

/// Events of one day, split by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayEvents {
    pub all_day: Vec<CalendarEvent>,
    pub timed: Vec<CalendarEvent>,
}

/// Events belonging to `day`, in display order
pub fn events_for_day(events: &[CalendarEvent], day: NaiveDate, tz: &Tz) -> DayEvents {
    let mut selected: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| occurs_on(event, day, tz))
        .collect();
    selected.sort_by(|a, b| a.display_order(b, tz));

    let (all_day, timed): (Vec<&CalendarEvent>, Vec<&CalendarEvent>) =
        selected.into_iter().partition(|event| event.is_all_day());

    DayEvents {
        all_day: all_day.into_iter().cloned().collect(),
        timed: timed.into_iter().cloned().collect(),
    }
}

/// "Tomorrow at a glance": per source, every all-day event plus the single
/// longest timed event.
///
/// Equal durations go to the earliest start, then the smallest id.
pub fn tomorrow_at_a_glance(events: &[CalendarEvent], tomorrow: NaiveDate, tz: &Tz) -> Vec<CalendarEvent> {
    let mut per_source: BTreeMap<usize, (Vec<&CalendarEvent>, Option<&CalendarEvent>)> = BTreeMap::new();

    for event in events.iter().filter(|event| occurs_on(event, tomorrow, tz)) {
        let (all_day, longest) = per_source.entry(event.source_index).or_default();

        if event.is_all_day() {
            all_day.push(event);
            continue;
        }

        let replace = match longest {
            None => true,
            Some(current) => event
                .duration()
                .cmp(&current.duration())
                .then_with(|| current.local_start(tz).cmp(&event.local_start(tz)))
                .then_with(|| current.id.cmp(&event.id))
                .is_gt(),
        };
        if replace {
            *longest = Some(event);
        }
    }

    let mut glance: Vec<CalendarEvent> = per_source
        .into_values()
        .flat_map(|(all_day, longest)| all_day.into_iter().chain(longest))
        .cloned()
        .collect();
    glance.sort_by(|a, b| a.display_order(b, tz));
    glance
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, min, 0).unwrap()
    }

    fn holiday(day: NaiveDate) -> CalendarEvent {
        CalendarEvent::all_day("holiday", "Holiday", day, day + Duration::days(1), 0)
    }

    #[test]
    fn test_all_day_ignores_utc_offset() {
        let event = holiday(date(2024, 3, 10));

        for tz in [chrono_tz::Pacific::Kiritimati, chrono_tz::Pacific::Pago_Pago, chrono_tz::UTC] {
            assert!(occurs_on(&event, date(2024, 3, 10), &tz));
            assert!(!occurs_on(&event, date(2024, 3, 9), &tz));
            assert!(!occurs_on(&event, date(2024, 3, 11), &tz));
        }
    }

    #[test]
    fn test_today_follows_local_date_not_utc() {
        // 2024-03-09 23:30 in Pago Pago is already 2024-03-10 in UTC
        let tz = chrono_tz::Pacific::Pago_Pago;
        let now = tz.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        let today = now.date_naive();

        let event = holiday(date(2024, 3, 10));
        assert_eq!(bucket(&event, today, &tz), DayBucket::Tomorrow);
        assert_eq!(bucket(&event, date(2024, 3, 10), &tz), DayBucket::Today);
    }

    #[test]
    fn test_multi_day_all_day_covers_each_day() {
        let trip = CalendarEvent::all_day("trip", "Trip", date(2024, 3, 9), date(2024, 3, 12), 0);
        let tz = chrono_tz::UTC;
        assert!(occurs_on(&trip, date(2024, 3, 9), &tz));
        assert!(occurs_on(&trip, date(2024, 3, 11), &tz));
        // Exclusive end
        assert!(!occurs_on(&trip, date(2024, 3, 12), &tz));
    }

    #[test]
    fn test_timed_uses_local_start_date() {
        let tz = chrono_tz::Europe::Helsinki;
        // 22:30 UTC on the 9th is 00:30 on the 10th in Helsinki
        let late = CalendarEvent::timed("late", "Late", utc(9, 22, 30), utc(9, 23, 30), 0);
        assert_eq!(bucket(&late, date(2024, 3, 10), &tz), DayBucket::Today);
        assert_eq!(bucket(&late, date(2024, 3, 9), &tz), DayBucket::Tomorrow);
        assert_eq!(bucket(&late, date(2024, 3, 8), &tz), DayBucket::Neither);
    }

    #[test]
    fn test_events_for_day_splits_and_orders() {
        let tz = chrono_tz::UTC;
        let day = date(2024, 3, 10);
        let events = vec![
            CalendarEvent::timed("b", "B", utc(10, 11, 0), utc(10, 12, 0), 0),
            CalendarEvent::timed("a", "A", utc(10, 9, 0), utc(10, 10, 0), 1),
            holiday(day),
            CalendarEvent::timed("other", "Other", utc(11, 9, 0), utc(11, 10, 0), 0),
        ];

        let today = events_for_day(&events, day, &tz);
        assert_eq!(today.all_day.len(), 1);
        let ids: Vec<&str> = today.timed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_tomorrow_at_a_glance_picks_longest_per_source() {
        let tz = chrono_tz::UTC;
        let tomorrow = date(2024, 3, 11);
        let events = vec![
            CalendarEvent::timed("short", "Short", utc(11, 8, 0), utc(11, 8, 30), 0),
            CalendarEvent::timed("long", "Long", utc(11, 13, 0), utc(11, 16, 0), 0),
            CalendarEvent::timed("other", "Other", utc(11, 10, 0), utc(11, 11, 0), 1),
            CalendarEvent::all_day("bday", "Birthday", tomorrow, tomorrow + Duration::days(1), 1),
            CalendarEvent::timed("today", "Today", utc(10, 8, 0), utc(10, 20, 0), 0),
        ];

        let glance = tomorrow_at_a_glance(&events, tomorrow, &tz);
        let ids: Vec<&str> = glance.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["bday", "other", "long"]);
    }

    #[test]
    fn test_tomorrow_at_a_glance_tie_break_earliest_start() {
        let tz = chrono_tz::UTC;
        let tomorrow = date(2024, 3, 11);
        let events = vec![
            CalendarEvent::timed("late", "Late", utc(11, 15, 0), utc(11, 16, 0), 0),
            CalendarEvent::timed("early", "Early", utc(11, 9, 0), utc(11, 10, 0), 0),
        ];

        let glance = tomorrow_at_a_glance(&events, tomorrow, &tz);
        assert_eq!(glance.len(), 1);
        assert_eq!(glance[0].id, "early");

        // Same result in reverse input order
        let reversed: Vec<CalendarEvent> = events.into_iter().rev().collect();
        assert_eq!(tomorrow_at_a_glance(&reversed, tomorrow, &tz)[0].id, "early");
    }
}
