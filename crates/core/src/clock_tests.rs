// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_starts_frozen() {
    let clock = FakeClock::new();
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);
}

#[test]
fn fake_clock_advance_moves_both_sides() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    let w0 = clock.now_utc();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - t0, Duration::from_secs(90));
    assert_eq!((clock.now_utc() - w0).num_seconds(), 90);
}

#[test]
fn fake_clock_clones_share_offset() {
    let clock = FakeClock::new();
    let clone = clock.clone();

    clock.advance(Duration::from_secs(10));
    assert_eq!(clone.now() - clock.now(), Duration::ZERO);
    assert_eq!(clone.now_utc(), clock.now_utc());
}

#[test]
fn system_clock_moves() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
