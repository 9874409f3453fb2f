use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Minutes in a calendar day
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Naive midnight at the start of a date
fn naive_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// First instant of a local calendar date
pub fn local_midnight(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = naive_midnight(date);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST transition: the day starts at the transition
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

/// Wall-clock minutes between local midnight of `day` and `instant`.
///
/// Negative before the day starts, above 1440 after it ends.
pub fn minutes_since_midnight(instant: &DateTime<Utc>, day: NaiveDate, tz: &Tz) -> f64 {
    let local = instant.with_timezone(tz).naive_local();
    let elapsed = local.signed_duration_since(naive_midnight(day));
    elapsed.num_seconds() as f64 / 60.0
}

/// Monday and Sunday of the week containing `date`
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date
        .checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
        .unwrap_or(date);

    let sunday = monday.checked_add_signed(Duration::days(6)).unwrap_or(monday);

    (monday, sunday)
}

/// Next wall-clock mark that is a multiple of `period_minutes` after local midnight.
///
/// A refresh every 5 minutes fires at :00, :05, :10 and so on rather than
/// 300 seconds after startup.
pub fn next_aligned_boundary(now: &DateTime<Tz>, period_minutes: u32) -> DateTime<Tz> {
    let period = i64::from(period_minutes.max(1)) * 60;
    let local = now.naive_local();
    let midnight = naive_midnight(local.date());
    let elapsed = local.signed_duration_since(midnight).num_seconds();
    let next = (elapsed / period + 1) * period;

    let target = midnight + Duration::seconds(next);
    match now.timezone().from_local_datetime(&target).earliest() {
        Some(dt) => dt,
        None => now.clone() + Duration::seconds(next - elapsed),
    }
}

/// Calculate the wait until `next`, never less than one second
pub fn calculate_wait_duration(now: &DateTime<Tz>, next: &DateTime<Tz>) -> std::time::Duration {
    let millis = next.clone().signed_duration_since(now.clone()).num_milliseconds();

    if millis < 1000 {
        return std::time::Duration::from_secs(1);
    }

    std::time::Duration::from_millis(millis as u64)
}

/// Format an instant as a local "HH:MM" label
pub fn format_clock(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant.with_timezone(tz).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Helsinki;
    use chrono_tz::UTC;

    #[test]
    fn test_week_bounds() {
        // Monday, 2023-01-02
        let monday = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert_eq!(
            week_bounds(monday),
            (monday, NaiveDate::from_ymd_opt(2023, 1, 8).unwrap())
        );

        // Wednesday, 2023-01-04
        let wednesday = NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();
        assert_eq!(week_bounds(wednesday).0, monday);

        // Sunday, 2023-01-08
        let sunday = NaiveDate::from_ymd_opt(2023, 1, 8).unwrap();
        assert_eq!(week_bounds(sunday), (monday, sunday));
    }

    #[test]
    fn test_next_aligned_boundary() {
        let now = Helsinki.with_ymd_and_hms(2024, 3, 10, 14, 2, 30).unwrap();

        let next = next_aligned_boundary(&now, 5);
        assert_eq!(next.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-10 14:05:00");

        let next = next_aligned_boundary(&now, 1);
        assert_eq!(next.format("%H:%M:%S").to_string(), "14:03:00");

        // Exactly on a mark moves to the following one
        let on_mark = Helsinki.with_ymd_and_hms(2024, 3, 10, 14, 5, 0).unwrap();
        let next = next_aligned_boundary(&on_mark, 5);
        assert_eq!(next.format("%H:%M").to_string(), "14:10");

        // Rolls over midnight
        let late = UTC.with_ymd_and_hms(2024, 3, 10, 23, 58, 0).unwrap();
        let next = next_aligned_boundary(&late, 5);
        assert_eq!(next.format("%Y-%m-%d %H:%M").to_string(), "2024-03-11 00:00");
    }

    #[test]
    fn test_calculate_wait_duration() {
        let now = UTC.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();

        let wait = calculate_wait_duration(&now, &(now.clone() + Duration::minutes(5)));
        assert_eq!(wait, std::time::Duration::from_secs(300));

        // Target in the past waits the minimum
        let wait = calculate_wait_duration(&now, &(now.clone() - Duration::minutes(5)));
        assert_eq!(wait, std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_minutes_since_midnight() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        // 12:30 UTC is 14:30 in Helsinki during winter time
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 0).unwrap();
        assert_eq!(minutes_since_midnight(&instant, day, &Helsinki), 870.0);

        // The previous evening is negative
        let before = Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap();
        assert_eq!(minutes_since_midnight(&before, day, &Helsinki), -60.0);
    }

    #[test]
    fn test_local_midnight() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let midnight = local_midnight(day, &Helsinki);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 9, 22, 0, 0).unwrap());
        assert_eq!(format_clock(&midnight, &Helsinki), "00:00");
    }
}
