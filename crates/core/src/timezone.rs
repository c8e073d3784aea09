// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-offset timezone helpers and calendar bucketing.
//!
//! The hub runs against one bootcamp campus, so a fixed UTC offset is
//! enough; DST is deliberately not modeled. Daily grinds and streaks are
//! bucketed by the campus-local calendar day.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

/// Fixed-offset campus timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tz {
    offset: FixedOffset,
}

impl Tz {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Whole-hour offset east of UTC. `None` when out of range (|h| > 23).
    pub fn east_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }

    /// Offset in minutes east of UTC.
    pub fn east_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    /// Parse `"UTC"`, `"Z"`, `"+05:00"`, `"-03:30"`, `"+05"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Some(Self::utc());
        }
        let (sign, rest) = match s.as_bytes().first()? {
            b'+' => (1, &s[1..]),
            b'-' => (-1, &s[1..]),
            _ => return None,
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
            None => match rest.len() {
                1 | 2 => (rest.parse::<i32>().ok()?, 0),
                4 => (rest[..2].parse::<i32>().ok()?, rest[2..].parse::<i32>().ok()?),
                _ => return None,
            },
        };
        if !(0..60).contains(&minutes) {
            return None;
        }
        Self::east_minutes(sign * (hours * 60 + minutes))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Convert to campus-local time.
    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    /// The campus-local calendar day containing `at`.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.to_local(at).date_naive()
    }

    /// UTC instant of campus-local midnight starting `date`.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        DateTime::from_naive_utc_and_offset(local_midnight - self.offset, Utc)
    }

    /// Half-open UTC bounds `[start, end)` of a campus-local day.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.day_start(date);
        let end = date
            .succ_opt()
            .map(|next| self.day_start(next))
            .unwrap_or(start);
        (start, end)
    }

    /// Monday of the campus-local week containing `at`.
    pub fn week_start(&self, at: DateTime<Utc>) -> NaiveDate {
        let date = self.local_date(at);
        date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
    }

    /// Next UTC instant at `hour:minute` campus-local strictly after
    /// `after`. `None` when hour/minute are out of range.
    pub fn next_daily(&self, hour: u32, minute: u32, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        let date = self.local_date(after);
        let today = DateTime::from_naive_utc_and_offset(date.and_time(time) - self.offset, Utc);
        if today > after {
            Some(today)
        } else {
            let next = date.succ_opt()?;
            Some(DateTime::from_naive_utc_and_offset(
                next.and_time(time) - self.offset,
                Utc,
            ))
        }
    }
}

impl Default for Tz {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
#[path = "timezone_tests.rs"]
mod tests;
