// src/hours.rs

//! Weekly opening hours and the open-status evaluation, including ranges
//! that span midnight.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One opening interval within a day. An overnight range has a close time
/// numerically earlier than its open time because it crosses midnight
/// (e.g. 22:00–02:00).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub overnight: bool,
}

impl TimeRange {
    /// Builds a range, inferring the overnight flag from close < open.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            open,
            close,
            overnight: close < open,
        }
    }
}

/// Opening intervals for one weekday. Days with no entry are closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayHours {
    pub day: Weekday,
    pub ranges: Vec<TimeRange>,
}

/// Ordered list of per-day opening hours as stored on a venue document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub days: Vec<DayHours>,
}

impl WeeklySchedule {
    pub fn ranges_for(&self, day: Weekday) -> &[TimeRange] {
        self.days
            .iter()
            .find(|d| d.day == day)
            .map(|d| d.ranges.as_slice())
            .unwrap_or(&[])
    }
}

/// Evaluates open state at a local day/time.
///
/// A non-overnight range matches when `open ≤ now ≤ close`. An overnight
/// range matches on its own day when `now ≥ open`, and bleeds into the
/// following day: yesterday's overnight range still covers `now ≤ close`
/// this morning. Missing schedule data is treated as closed rather than
/// guessing open.
pub fn is_open_at(schedule: Option<&WeeklySchedule>, day: Weekday, now: NaiveTime) -> bool {
    let Some(schedule) = schedule else {
        return false;
    };

    for range in schedule.ranges_for(day) {
        let open = if range.overnight {
            now >= range.open
        } else {
            now >= range.open && now <= range.close
        };
        if open {
            return true;
        }
    }

    // Yesterday's overnight span continuing past midnight into today.
    for range in schedule.ranges_for(day.pred()) {
        if range.overnight && now <= range.close {
            return true;
        }
    }

    false
}
