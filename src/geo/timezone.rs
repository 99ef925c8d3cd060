// src/geo/timezone.rs
// Resolves coordinates to the venue's local wall clock for open-status
// evaluation.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use tracing::warn;
use tzf_rs::DefaultFinder;

use crate::error::EngineError;
use crate::types::GeoPoint;

// The finder embeds the time-zone polygon data; build it once per process.
static TZ_FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// Local wall-clock values at a venue's location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalClock {
    pub weekday: Weekday,
    pub time: NaiveTime,
    /// True when the coordinates could not be mapped to a zone and UTC was
    /// used instead; downstream open-status results are low-confidence.
    pub utc_fallback: bool,
}

/// Resolves the local day-of-week and clock time at `point`, as of now.
pub fn resolve_local_time(point: GeoPoint) -> Result<LocalClock, EngineError> {
    resolve_local_time_at(point, Utc::now())
}

/// As `resolve_local_time`, but against a caller-supplied instant.
pub fn resolve_local_time_at(
    point: GeoPoint,
    now_utc: DateTime<Utc>,
) -> Result<LocalClock, EngineError> {
    if !point.is_valid() {
        return Err(EngineError::GeoResolution(format!(
            "coordinates out of range: ({}, {})",
            point.lat, point.lng
        )));
    }

    // tzf takes (lng, lat) order.
    let tz_name = TZ_FINDER.get_tz_name(point.lng, point.lat);
    if tz_name.is_empty() {
        return Err(EngineError::GeoResolution(format!(
            "no time zone for ({}, {})",
            point.lat, point.lng
        )));
    }

    let tz = Tz::from_str(tz_name).map_err(|_| {
        EngineError::GeoResolution(format!("unknown time zone name: {tz_name}"))
    })?;

    let local = now_utc.with_timezone(&tz);
    Ok(LocalClock {
        weekday: local.weekday(),
        time: NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
            .unwrap_or(NaiveTime::MIN),
        utc_fallback: false,
    })
}

/// Resolution that never fails: unmappable coordinates degrade to the UTC
/// clock with `utc_fallback` set, so the caller can flag low confidence
/// instead of dropping the candidate.
pub fn resolve_or_utc(point: GeoPoint) -> LocalClock {
    resolve_or_utc_at(point, Utc::now())
}

pub fn resolve_or_utc_at(point: GeoPoint, now_utc: DateTime<Utc>) -> LocalClock {
    match resolve_local_time_at(point, now_utc) {
        Ok(clock) => clock,
        Err(e) => {
            warn!("Falling back to UTC for ({}, {}): {}", point.lat, point.lng, e);
            LocalClock {
                weekday: now_utc.weekday(),
                time: now_utc.time(),
                utc_fallback: true,
            }
        }
    }
}
