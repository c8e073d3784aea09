// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[test]
fn full_rollout_enables_everyone() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2"));

    for id in 0..50 {
        assert!(store.is_enabled("digest.v2", &Principal::new(id), now()));
    }
}

#[test]
fn zero_rollout_enables_no_one() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_rollout(0));

    for id in 0..50 {
        assert!(!store.is_enabled("digest.v2", &Principal::new(id), now()));
    }
}

#[test]
fn bucketing_is_deterministic() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_rollout(40));

    let principal = Principal::new(1234);
    let first = store.is_enabled("digest.v2", &principal, now());
    for _ in 0..20 {
        assert_eq!(store.is_enabled("digest.v2", &principal, now()), first);
    }
}

#[test]
fn partial_rollout_splits_population() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_rollout(50));

    let enabled = (0..1000)
        .filter(|id| store.is_enabled("digest.v2", &Principal::new(*id), now()))
        .count();
    // Hash split won't be exact; it must land in a sane band
    assert!(
        (350..=650).contains(&enabled),
        "50% rollout enabled {enabled}/1000"
    );
}

#[test]
fn unknown_flag_is_off() {
    let store = FlagStore::new();
    assert!(!store.is_enabled("missing", &Principal::new(1), now()));
}

#[test]
fn disabled_flag_is_off() {
    let store = FlagStore::new();
    let mut flag = FeatureFlag::on("digest.v2");
    flag.enabled = false;
    store.upsert(flag);

    assert!(!store.is_enabled("digest.v2", &Principal::new(1), now()));
}

#[test]
fn override_wins_over_everything() {
    let store = FlagStore::new();
    let mut flag = FeatureFlag::on("digest.v2");
    flag.enabled = false;
    store.upsert(flag);

    store.set_override("digest.v2", 7, true);
    assert!(store.is_enabled("digest.v2", &Principal::new(7), now()));
    assert!(!store.is_enabled("digest.v2", &Principal::new(8), now()));

    // Override can also force off a fully-on flag
    store.upsert(FeatureFlag::on("helpers.match"));
    store.set_override("helpers.match", 7, false);
    assert!(!store.is_enabled("helpers.match", &Principal::new(7), now()));

    store.clear_override("helpers.match", 7);
    assert!(store.is_enabled("helpers.match", &Principal::new(7), now()));
}

#[test]
fn admin_sees_known_flags_even_disabled() {
    let store = FlagStore::new();
    let mut flag = FeatureFlag::on("digest.v2");
    flag.enabled = false;
    store.upsert(flag);

    assert!(store.is_enabled("digest.v2", &Principal::admin(1), now()));
    assert!(!store.is_enabled("missing", &Principal::admin(1), now()));
}

#[test]
fn time_window_gates() {
    let store = FlagStore::new();
    let start = now() + chrono::Duration::hours(1);
    let end = now() + chrono::Duration::hours(2);
    store.upsert(FeatureFlag::on("digest.v2").with_window(Some(start), Some(end)));

    let p = Principal::new(1);
    assert!(!store.is_enabled("digest.v2", &p, now()), "before window");
    assert!(store.is_enabled("digest.v2", &p, start), "window start is inclusive");
    assert!(!store.is_enabled("digest.v2", &p, end), "window end is exclusive");
}

#[test]
fn cohort_targeting() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_cohorts(["cohort-24"]));

    assert!(store.is_enabled(
        "digest.v2",
        &Principal::in_cohort(1, "cohort-24"),
        now()
    ));
    assert!(!store.is_enabled(
        "digest.v2",
        &Principal::in_cohort(1, "cohort-25"),
        now()
    ));
    assert!(
        !store.is_enabled("digest.v2", &Principal::new(1), now()),
        "no cohort fails targeting"
    );
}

#[test]
fn variant_selection_stable_and_gated() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_variants(["compact", "detailed", "emoji"]));

    let p = Principal::new(99);
    let chosen = store.variant("digest.v2", &p, now()).unwrap();
    for _ in 0..10 {
        assert_eq!(store.variant("digest.v2", &p, now()).as_deref(), Some(chosen.as_str()));
    }

    // Off flag yields no variant
    store.upsert(
        FeatureFlag::on("digest.v2")
            .with_rollout(0)
            .with_variants(["compact", "detailed"]),
    );
    assert_eq!(store.variant("digest.v2", &p, now()), None);

    // No variants configured
    store.upsert(FeatureFlag::on("plain"));
    assert_eq!(store.variant("plain", &p, now()), None);
}

#[test]
fn variants_spread_across_principals() {
    let store = FlagStore::new();
    store.upsert(FeatureFlag::on("digest.v2").with_variants(["a", "b"]));

    let distinct: std::collections::HashSet<_> = (0..100)
        .filter_map(|id| store.variant("digest.v2", &Principal::new(id), now()))
        .collect();
    assert_eq!(distinct.len(), 2, "both variants should appear");
}
