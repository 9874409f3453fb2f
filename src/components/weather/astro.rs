use super::models::{MoonPhase, MoonPhaseName, SunEvent, SunEventKind};
use crate::utils::time::format_clock;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use std::f64::consts::PI;

/// Mean length of a lunar cycle in days
pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

lazy_static! {
    /// New moon of 2000-01-06 18:14 UTC
    static ref REFERENCE_NEW_MOON: DateTime<Utc> =
        Utc.timestamp_opt(947_182_440, 0).single().unwrap_or_default();
}

const PHASES: [MoonPhaseName; 8] = [
    MoonPhaseName::NewMoon,
    MoonPhaseName::WaxingCrescent,
    MoonPhaseName::FirstQuarter,
    MoonPhaseName::WaxingGibbous,
    MoonPhaseName::FullMoon,
    MoonPhaseName::WaningGibbous,
    MoonPhaseName::LastQuarter,
    MoonPhaseName::WaningCrescent,
];

/// Moon phase at an instant, from the mean synodic month
pub fn moon_phase(at: &DateTime<Utc>) -> MoonPhase {
    let elapsed_days = (*at - *REFERENCE_NEW_MOON).num_seconds() as f64 / 86_400.0;
    let age_days = elapsed_days.rem_euclid(SYNODIC_MONTH_DAYS);
    let fraction = age_days / SYNODIC_MONTH_DAYS;

    let phase = PHASES[((fraction * 8.0 + 0.5).floor() as usize) % PHASES.len()];
    let illumination = (1.0 - (2.0 * PI * fraction).cos()) / 2.0;

    MoonPhase {
        phase,
        age_days,
        illumination,
        label: moon_label(phase),
    }
}

fn moon_label(phase: MoonPhaseName) -> String {
    match phase {
        MoonPhaseName::NewMoon => t!("moon_new_moon"),
        MoonPhaseName::WaxingCrescent => t!("moon_waxing_crescent"),
        MoonPhaseName::FirstQuarter => t!("moon_first_quarter"),
        MoonPhaseName::WaxingGibbous => t!("moon_waxing_gibbous"),
        MoonPhaseName::FullMoon => t!("moon_full_moon"),
        MoonPhaseName::WaningGibbous => t!("moon_waning_gibbous"),
        MoonPhaseName::LastQuarter => t!("moon_last_quarter"),
        MoonPhaseName::WaningCrescent => t!("moon_waning_crescent"),
    }
    .to_string()
}

/// Next sunrise or sunset after `now`.
///
/// Uses today's sunrise and sunset, then tomorrow's sunrise once the sun has
/// set.
pub fn next_sun_event(
    now: &DateTime<Utc>,
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
    tomorrow_sunrise: Option<DateTime<Utc>>,
    tz: &Tz,
) -> Option<SunEvent> {
    let (kind, at) = if *now < sunrise {
        (SunEventKind::Sunrise, sunrise)
    } else if *now < sunset {
        (SunEventKind::Sunset, sunset)
    } else {
        (SunEventKind::Sunrise, tomorrow_sunrise?)
    };

    let label = match kind {
        SunEventKind::Sunrise => t!("sunrise"),
        SunEventKind::Sunset => t!("sunset"),
    }
    .to_string();

    Some(SunEvent {
        kind,
        at,
        local_time: format_clock(&at, tz),
        label,
    })
}
