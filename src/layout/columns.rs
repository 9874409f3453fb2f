//! Side-by-side lanes for overlapping timed events.
//!
//! Greedy interval coloring: events are visited by start time and dropped
//! into the leftmost lane that has room. The result is not the minimal lane
//! count, but an event keeps its lane when unrelated events come and go.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::components::calendar::models::CalendarEvent;

/// A timed event with its lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedEvent {
    #[serde(flatten)]
    pub event: CalendarEvent,
    /// Zero-based lane
    pub column: usize,
    /// Number of lanes sharing the width around this event
    pub total_columns: usize,
}

type Interval = (DateTime<Utc>, DateTime<Utc>);

/// Half-open overlap test. Touching intervals and empty intervals never overlap.
pub fn overlaps(a: Interval, b: Interval) -> bool {
    a.0 < a.1 && b.0 < b.1 && a.0 < b.1 && b.0 < a.1
}

/// Assign a lane to every timed event of one day.
///
/// All-day events are skipped. Output is ordered by start time, ties by
/// source index and then id, so the same set of events always gets the same
/// lanes whatever order the sources delivered them in.
pub fn assign_columns(events: &[CalendarEvent]) -> Vec<PositionedEvent> {
    let mut timed: Vec<(&CalendarEvent, Interval)> = events
        .iter()
        .filter_map(|event| event.timed_bounds().map(|bounds| (event, bounds)))
        .collect();

    timed.sort_by(|(a, a_bounds), (b, b_bounds)| {
        a_bounds
            .0
            .cmp(&b_bounds.0)
            .then_with(|| a.source_index.cmp(&b.source_index))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut columns: Vec<Vec<usize>> = Vec::new();
    let mut placement = Vec::with_capacity(timed.len());

    for (index, (_, bounds)) in timed.iter().enumerate() {
        let free = columns.iter().position(|members| {
            members
                .iter()
                .all(|&other| !overlaps(*bounds, timed[other].1))
        });

        let column = match free {
            Some(column) => column,
            None => {
                columns.push(Vec::new());
                columns.len() - 1
            }
        };
        columns[column].push(index);
        placement.push(column);
    }

    timed
        .iter()
        .enumerate()
        .map(|(index, (event, bounds))| {
            let overlapping_columns = columns
                .iter()
                .enumerate()
                .filter(|(column, _)| *column != placement[index])
                .filter(|(_, members)| {
                    members
                        .iter()
                        .any(|&other| overlaps(*bounds, timed[other].1))
                })
                .count();

            let (column, total_columns) = if overlapping_columns > 0 {
                (placement[index], overlapping_columns + 1)
            } else {
                (0, 1)
            };

            PositionedEvent {
                event: (*event).clone(),
                column,
                total_columns,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn event(id: &str, start: (u32, u32), end: (u32, u32)) -> CalendarEvent {
        CalendarEvent::timed(id, id, at(start.0, start.1), at(end.0, end.1), 0)
    }

    fn lanes(positioned: &[PositionedEvent]) -> Vec<(String, usize, usize)> {
        positioned
            .iter()
            .map(|p| (p.event.id.clone(), p.column, p.total_columns))
            .collect()
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps((at(9, 0), at(10, 0)), (at(9, 30), at(9, 45))));
        // Back-to-back
        assert!(!overlaps((at(9, 0), at(10, 0)), (at(10, 0), at(11, 0))));
        // Empty interval inside another one
        assert!(!overlaps((at(9, 30), at(9, 30)), (at(9, 0), at(10, 0))));
    }

    #[test]
    fn test_single_event_takes_full_width() {
        let positioned = assign_columns(&[event("a", (9, 0), (10, 0))]);
        assert_eq!(lanes(&positioned), vec![("a".to_string(), 0, 1)]);
    }

    #[test]
    fn test_nested_and_chained_events_use_two_columns() {
        let events = vec![
            event("1", (9, 0), (10, 0)),
            event("2", (9, 30), (9, 45)),
            event("3", (9, 45), (11, 0)),
        ];
        let positioned = assign_columns(&events);
        assert_eq!(
            lanes(&positioned),
            vec![
                ("1".to_string(), 0, 2),
                ("2".to_string(), 1, 2),
                ("3".to_string(), 1, 2),
            ]
        );
    }

    #[test]
    fn test_back_to_back_share_a_column() {
        let events = vec![event("a", (9, 0), (10, 0)), event("b", (10, 0), (11, 0))];
        let positioned = assign_columns(&events);
        assert_eq!(
            lanes(&positioned),
            vec![("a".to_string(), 0, 1), ("b".to_string(), 0, 1)]
        );
    }

    #[test]
    fn test_identical_intervals_split() {
        let events = vec![event("a", (9, 0), (10, 0)), event("b", (9, 0), (10, 0))];
        let positioned = assign_columns(&events);
        assert_eq!(
            lanes(&positioned),
            vec![("a".to_string(), 0, 2), ("b".to_string(), 1, 2)]
        );
    }

    #[test]
    fn test_zero_duration_event_stays_full_width() {
        let events = vec![event("long", (9, 0), (11, 0)), event("pin", (10, 0), (10, 0))];
        let positioned = assign_columns(&events);
        assert_eq!(
            lanes(&positioned),
            vec![("long".to_string(), 0, 1), ("pin".to_string(), 0, 1)]
        );
    }

    #[test]
    fn test_width_reflects_own_neighborhood_only() {
        // A busy morning cluster must not narrow the lone afternoon event
        let events = vec![
            event("m1", (8, 0), (9, 0)),
            event("m2", (8, 0), (9, 0)),
            event("m3", (8, 30), (9, 30)),
            event("pm", (14, 0), (15, 0)),
        ];
        let positioned = assign_columns(&events);
        let pm = positioned.iter().find(|p| p.event.id == "pm").unwrap();
        assert_eq!((pm.column, pm.total_columns), (0, 1));
        let m3 = positioned.iter().find(|p| p.event.id == "m3").unwrap();
        assert_eq!((m3.column, m3.total_columns), (2, 3));
    }

    #[test]
    fn test_column_never_reaches_total() {
        let events = vec![
            event("a", (9, 0), (12, 0)),
            event("b", (9, 0), (10, 0)),
            event("c", (9, 0), (10, 0)),
            event("d", (10, 30), (11, 0)),
            event("e", (11, 30), (13, 0)),
        ];
        for p in assign_columns(&events) {
            assert!(p.column < p.total_columns, "{:?}", p);
        }
    }

    #[test]
    fn test_all_day_events_are_ignored() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let events = vec![
            CalendarEvent::all_day("holiday", "Holiday", day, day + Duration::days(1), 0),
            event("a", (9, 0), (10, 0)),
        ];
        let positioned = assign_columns(&events);
        assert_eq!(positioned.len(), 1);
        assert_eq!(positioned[0].event.id, "a");
    }

    #[test]
    fn test_tie_break_by_source_then_id() {
        let mut first = event("z", (9, 0), (10, 0));
        first.source_index = 0;
        let mut second = event("a", (9, 0), (10, 0));
        second.source_index = 1;

        let forward = assign_columns(&[first.clone(), second.clone()]);
        let backward = assign_columns(&[second, first]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].event.id, "z");
    }
}
