// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hearth_core::FakeClock;
use yare::parameterized;

#[parameterized(
    bare = { "/rank", Some(("rank", "")) },
    with_args = { "/helpers graphs task", Some(("helpers", "graphs task")) },
    addressed_to_us = { "/rank@hearth_bot", Some(("rank", "")) },
    addressed_case = { "/rank@HEARTH_BOT 5", Some(("rank", "5")) },
    addressed_elsewhere = { "/rank@other_bot", None },
    not_a_command = { "rank please", None },
    bare_slash = { "/", None },
    leading_spaces = { "  /top 10", Some(("top", "10")) },
    extra_arg_spaces = { "/top   10 20", Some(("top", "10 20")) },
)]
fn command_parsing(text: &str, expected: Option<(&str, &str)>) {
    let expected = expected.map(|(c, a)| (c, a));
    assert_eq!(parse_command(text, "hearth_bot"), expected);
}

#[test]
fn update_document_round_trip() {
    let json = serde_json::json!({
        "update_id": 815,
        "message": {
            "message_id": 1,
            "from": {"id": 42, "username": "amartin"},
            "chat": {"id": -100},
            "text": "/rank"
        }
    });
    let update: Update = serde_json::from_value(json).unwrap();
    assert_eq!(update.update_id, 815);
    let message = update.message.as_ref().unwrap();
    assert_eq!(message.chat.id, -100);
    assert_eq!(message.text.as_deref(), Some("/rank"));
    assert!(update.callback_query.is_none());

    let back = serde_json::to_value(&update).unwrap();
    let again: Update = serde_json::from_value(back).unwrap();
    assert_eq!(again, update);
}

#[test]
fn callback_update_parses() {
    let update: Update = serde_json::from_value(serde_json::json!({
        "update_id": 816,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": 42},
            "data": "page:2"
        }
    }))
    .unwrap();
    assert_eq!(
        update.callback_query.unwrap().data.as_deref(),
        Some("page:2")
    );
}

#[test]
fn rate_window_limits_and_recovers() {
    let clock = FakeClock::new();
    let client = ChatClient::with_clock(
        ChatConfig {
            per_second_limit: 2,
            ..ChatConfig::default()
        },
        BreakerConfig::chat_api(),
        clock.clone(),
    )
    .unwrap();

    client.check_rate().unwrap();
    client.check_rate().unwrap();
    let err = client.check_rate().unwrap_err();
    assert!(matches!(err, DomainError::RateLimited { retry_after: Some(_) }));

    clock.advance(Duration::from_millis(1100));
    client.check_rate().unwrap();
}

#[test]
fn method_url_embeds_token() {
    let client = ChatClient::new(ChatConfig {
        base_url: "https://chat.example/".to_string(),
        token: "abc123".to_string(),
        ..ChatConfig::default()
    })
    .unwrap();
    assert_eq!(
        client.method_url("sendMessage"),
        "https://chat.example/botabc123/sendMessage"
    );
}
