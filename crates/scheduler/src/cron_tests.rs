// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn next(expr: &str, after: &str) -> DateTime<Utc> {
    CronExpr::parse(expr)
        .unwrap()
        .next_after(utc(after), Tz::utc())
        .unwrap()
}

#[parameterized(
    every_minute = { "* * * * *" },
    daily_digest = { "30 9 * * *" },
    step = { "*/15 * * * *" },
    range = { "0 9-17 * * *" },
    list = { "0 0 1,15 * *" },
    list_with_range = { "0 0 * * 1-5,0" },
    weekly = { "0 8 * * 1" },
)]
fn accepts_supported_syntax(expr: &str) {
    CronExpr::parse(expr).unwrap();
}

#[parameterized(
    too_few = { "* * * *" },
    too_many = { "* * * * * *" },
    seconds_field = { "0 0 12 * * ?" },
    month_name = { "0 0 * JAN *" },
    weekday_name = { "0 0 * * MON" },
    last_day = { "0 0 L * *" },
    nearest_weekday = { "0 0 15W * *" },
    nth_weekday = { "0 0 * * 5#3" },
    minute_range_bad = { "60 * * * *" },
    hour_out_of_range = { "0 24 * * *" },
    dow_out_of_range = { "0 0 * * 7" },
    inverted_range = { "0 9-3 * * *" },
    empty = { "" },
)]
fn rejects_unsupported_syntax(expr: &str) {
    assert!(CronExpr::parse(expr).is_err(), "accepted {expr:?}");
}

#[test]
fn next_minute_boundary_is_strict() {
    // At exactly 09:30:00, the next "30 9" slot is tomorrow
    assert_eq!(
        next("30 9 * * *", "2026-03-02T09:30:00Z"),
        utc("2026-03-03T09:30:00Z")
    );
    // One minute earlier it is today
    assert_eq!(
        next("30 9 * * *", "2026-03-02T09:29:00Z"),
        utc("2026-03-02T09:30:00Z")
    );
}

#[test]
fn every_minute_advances_by_one() {
    assert_eq!(
        next("* * * * *", "2026-03-02T10:15:20Z"),
        utc("2026-03-02T10:16:00Z")
    );
}

#[test]
fn step_minutes() {
    assert_eq!(
        next("*/15 * * * *", "2026-03-02T10:16:00Z"),
        utc("2026-03-02T10:30:00Z")
    );
}

#[test]
fn weekly_rolls_to_next_monday() {
    // 2026-03-02 is a Monday; at 09:00 the 08:00 slot is gone
    assert_eq!(
        next("0 8 * * 1", "2026-03-02T09:00:00Z"),
        utc("2026-03-09T08:00:00Z")
    );
}

#[test]
fn month_restriction_skips_ahead() {
    assert_eq!(
        next("0 0 1 6 *", "2026-03-02T00:00:00Z"),
        utc("2026-06-01T00:00:00Z")
    );
}

#[test]
fn dom_and_dow_combine_with_or() {
    // The 15th or any Friday. From Mar 2 2026 (Mon), first Friday is Mar 6.
    assert_eq!(
        next("0 0 15 * 5", "2026-03-02T00:00:00Z"),
        utc("2026-03-06T00:00:00Z")
    );
    // From Mar 7, the 15th (a Sunday) comes before the next Friday? No:
    // Friday Mar 13 precedes Sunday Mar 15.
    assert_eq!(
        next("0 0 15 * 5", "2026-03-07T00:00:00Z"),
        utc("2026-03-13T00:00:00Z")
    );
    // From Mar 14, the 15th wins
    assert_eq!(
        next("0 0 15 * 5", "2026-03-14T00:00:00Z"),
        utc("2026-03-15T00:00:00Z")
    );
}

#[test]
fn evaluation_respects_timezone() {
    let tz = Tz::east_hours(5).unwrap();
    let expr = CronExpr::parse("0 9 * * *").unwrap();

    // 03:30 UTC = 08:30 local; 09:00 local = 04:00 UTC
    assert_eq!(
        expr.next_after(utc("2026-03-02T03:30:00Z"), tz).unwrap(),
        utc("2026-03-02T04:00:00Z")
    );
    // 04:30 UTC = 09:30 local; next slot is tomorrow 04:00 UTC
    assert_eq!(
        expr.next_after(utc("2026-03-02T04:30:00Z"), tz).unwrap(),
        utc("2026-03-03T04:00:00Z")
    );
}

#[test]
fn feb_29_found_years_ahead() {
    assert_eq!(
        next("0 0 29 2 *", "2026-03-01T00:00:00Z"),
        utc("2028-02-29T00:00:00Z")
    );
}

#[test]
fn sunday_is_zero() {
    // 2026-03-08 is a Sunday
    assert_eq!(
        next("0 12 * * 0", "2026-03-02T00:00:00Z"),
        utc("2026-03-08T12:00:00Z")
    );
}
