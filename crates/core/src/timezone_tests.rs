// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[parameterized(
    utc_name = { "UTC", Some(0) },
    utc_lower = { "utc", Some(0) },
    zulu = { "Z", Some(0) },
    empty = { "", Some(0) },
    plus_five = { "+05:00", Some(300) },
    plus_five_bare = { "+05", Some(300) },
    plus_five_compact = { "+0500", Some(300) },
    half_hour = { "-03:30", Some(-210) },
    kathmandu = { "+05:45", Some(345) },
    junk = { "tomorrow", None },
    bad_minutes = { "+05:99", None },
    bare_number = { "500", None },
)]
fn parse_offsets(input: &str, expected_minutes: Option<i32>) {
    let parsed = Tz::parse(input);
    match expected_minutes {
        Some(mins) => {
            let tz = parsed.unwrap();
            assert_eq!(tz.offset().local_minus_utc(), mins * 60);
        }
        None => assert!(parsed.is_none(), "expected parse failure for {input:?}"),
    }
}

#[test]
fn local_date_crosses_midnight() {
    let tz = Tz::east_hours(5).unwrap();
    // 20:30 UTC = 01:30 next day at +05:00
    let at = utc("2026-03-02T20:30:00Z");
    assert_eq!(tz.local_date(at), "2026-03-03".parse().unwrap());
    assert_eq!(Tz::utc().local_date(at), "2026-03-02".parse().unwrap());
}

#[test]
fn day_bounds_are_half_open_utc() {
    let tz = Tz::east_hours(5).unwrap();
    let (start, end) = tz.day_bounds("2026-03-03".parse().unwrap());
    assert_eq!(start, utc("2026-03-02T19:00:00Z"));
    assert_eq!(end, utc("2026-03-03T19:00:00Z"));
}

#[test]
fn week_starts_monday() {
    let tz = Tz::utc();
    // 2026-03-05 is a Thursday
    let thursday = utc("2026-03-05T10:00:00Z");
    assert_eq!(tz.week_start(thursday), "2026-03-02".parse().unwrap());

    let monday = utc("2026-03-02T00:00:00Z");
    assert_eq!(tz.week_start(monday), "2026-03-02".parse().unwrap());
}

#[test]
fn next_daily_same_day_when_still_ahead() {
    let tz = Tz::east_hours(5).unwrap();
    // 03:00 UTC = 08:00 local; digest at 09:00 local = 04:00 UTC
    let after = utc("2026-03-02T03:00:00Z");
    assert_eq!(
        tz.next_daily(9, 0, after),
        Some(utc("2026-03-02T04:00:00Z"))
    );
}

#[test]
fn next_daily_rolls_to_tomorrow() {
    let tz = Tz::east_hours(5).unwrap();
    // 05:00 UTC = 10:00 local, past the 09:00 slot
    let after = utc("2026-03-02T05:00:00Z");
    assert_eq!(
        tz.next_daily(9, 0, after),
        Some(utc("2026-03-03T04:00:00Z"))
    );
}

#[test]
fn next_daily_is_strictly_after() {
    let tz = Tz::utc();
    let at_slot = utc("2026-03-02T09:00:00Z");
    assert_eq!(
        tz.next_daily(9, 0, at_slot),
        Some(utc("2026-03-03T09:00:00Z"))
    );
}

#[test]
fn next_daily_rejects_bad_time() {
    assert_eq!(Tz::utc().next_daily(24, 0, Utc::now()), None);
    assert_eq!(Tz::utc().next_daily(9, 60, Utc::now()), None);
}
