// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expressions.
//!
//! Supported syntax per field: `*`, `*/step`, single values, ranges
//! `a-b`, and comma lists whose elements may be values or ranges. Month
//! and weekday names, `L`, `W`, `#`, seconds, and year fields are parse
//! errors: rejecting beats silently misinterpreting. When both
//! day-of-month and day-of-week are restricted they combine with OR,
//! classic cron style. Evaluation happens in a fixed-offset timezone.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use hearth_core::Tz;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("field {field}: unsupported syntax {input:?}")]
    Unsupported { field: &'static str, input: String },

    #[error("field {field}: value {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    values: BTreeSet<u32>,
    /// Whether the field was `*` (or `*/1`), i.e. unrestricted.
    any: bool,
}

impl Field {
    fn contains(&self, value: u32) -> bool {
        self.values.contains(&value)
    }
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23 };
const DOM: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12 };
const DOW: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 6 };

fn parse_value(spec: &FieldSpec, s: &str) -> Result<u32, CronParseError> {
    let value: u32 = s.parse().map_err(|_| CronParseError::Unsupported {
        field: spec.name,
        input: s.to_string(),
    })?;
    if value < spec.min || value > spec.max {
        return Err(CronParseError::OutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

fn parse_field(spec: &FieldSpec, input: &str) -> Result<Field, CronParseError> {
    if input == "*" {
        return Ok(Field {
            values: (spec.min..=spec.max).collect(),
            any: true,
        });
    }

    if let Some(step) = input.strip_prefix("*/") {
        let step = parse_value(
            &FieldSpec {
                name: spec.name,
                min: 1,
                max: spec.max.max(1),
            },
            step,
        )?;
        return Ok(Field {
            values: (spec.min..=spec.max).filter(|v| (v - spec.min) % step == 0).collect(),
            any: step == 1,
        });
    }

    let mut values = BTreeSet::new();
    for part in input.split(',') {
        if let Some((lo, hi)) = part.split_once('-') {
            let lo = parse_value(spec, lo)?;
            let hi = parse_value(spec, hi)?;
            if lo > hi {
                return Err(CronParseError::Unsupported {
                    field: spec.name,
                    input: part.to_string(),
                });
            }
            values.extend(lo..=hi);
        } else {
            values.insert(parse_value(spec, part)?);
        }
    }
    if values.is_empty() {
        return Err(CronParseError::Unsupported {
            field: spec.name,
            input: input.to_string(),
        });
    }
    Ok(Field { values, any: false })
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    dom: Field,
    month: Field,
    dow: Field,
    source: String,
}

impl CronExpr {
    pub fn parse(input: &str) -> Result<Self, CronParseError> {
        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronParseError::FieldCount(fields.len()));
        }
        Ok(Self {
            minute: parse_field(&MINUTE, fields[0])?,
            hour: parse_field(&HOUR, fields[1])?,
            dom: parse_field(&DOM, fields[2])?,
            month: parse_field(&MONTH, fields[3])?,
            dow: parse_field(&DOW, fields[4])?,
            source: input.to_string(),
        })
    }

    /// Original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Standard cron day rule: when both day fields are restricted, a day
    /// matches if either does; otherwise the restricted one decides.
    fn day_matches(&self, dom: u32, dow: u32) -> bool {
        match (self.dom.any, self.dow.any) {
            (true, true) => true,
            (false, true) => self.dom.contains(dom),
            (true, false) => self.dow.contains(dow),
            (false, false) => self.dom.contains(dom) || self.dow.contains(dow),
        }
    }

    /// Next fire time strictly after `after`, evaluated in `tz`.
    ///
    /// Searches at most ~4 years ahead, which covers every satisfiable
    /// five-field expression (Feb 29 is the worst case).
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local = tz.to_local(after);
        // First candidate: the next whole minute
        let mut date = local.date_naive();
        let mut from_minute = local.hour() * 60 + local.minute() + 1;

        for _ in 0..(366 * 4 + 1) {
            let month = date.month();
            let dom = date.day();
            let dow = date.weekday().num_days_from_sunday();

            if self.month.contains(month) && self.day_matches(dom, dow) {
                for slot in from_minute..(24 * 60) {
                    let hour = slot / 60;
                    let minute = slot % 60;
                    if self.hour.contains(hour) && self.minute.contains(minute) {
                        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                        let naive = date.and_time(time) - tz.offset();
                        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
                    }
                }
            }
            date = date.succ_opt()?;
            from_minute = 0;
        }
        None
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
