// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn student_id_display() {
    let id = StudentId::new("stu-42");
    assert_eq!(id.to_string(), "stu-42");
}

#[test]
fn student_id_equality() {
    let id1 = StudentId::new("stu-1");
    let id2 = StudentId::new("stu-1");
    let id3 = StudentId::new("stu-2");

    assert_eq!(id1, id2);
    assert_ne!(id1, id3);
}

#[test]
fn student_id_from_str() {
    let id: StudentId = "stu".into();
    assert_eq!(id.as_str(), "stu");
}

#[test]
fn student_id_serde() {
    let id = StudentId::new("stu-9");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"stu-9\"");

    let parsed: StudentId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn short_truncates() {
    let id = SnapshotId::new("abcdef-123456");
    assert_eq!(id.short(6), "abcdef");
    assert_eq!(id.short(100), "abcdef-123456");
    assert_eq!("ab".short(6), "ab");
}

#[test]
fn uuid_idgen_unique() {
    let gen = UuidIdGen;
    assert_ne!(gen.next(), gen.next());
}

#[test]
fn seq_idgen_sequential() {
    let gen = SeqIdGen::new();
    assert_eq!(gen.next(), "id-0");
    assert_eq!(gen.next(), "id-1");

    let clone = gen.clone();
    assert_eq!(clone.next(), "id-2", "clones share the counter");
}
