// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn versions_are_strictly_increasing() {
    let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
    assert!(!versions.is_empty());
    assert!(
        versions.windows(2).all(|w| w[0] < w[1]),
        "versions must be ordered: {versions:?}"
    );
}

#[test]
fn names_are_unique() {
    let mut names: Vec<&str> = MIGRATIONS.iter().map(|m| m.name).collect();
    names.sort_unstable();
    let before = names.len();
    names.dedup();
    assert_eq!(before, names.len());
}

#[test]
fn every_table_is_created_idempotently() {
    for migration in MIGRATIONS {
        assert!(
            migration.sql.contains("IF NOT EXISTS"),
            "migration {} is not idempotent",
            migration.name
        );
    }
}
