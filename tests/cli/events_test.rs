//! Tests for stream-json event decoding.

use auto_claude::cli::{ClaudeEvent, ContentBlock};
use serde_json::json;

fn decode(value: serde_json::Value) -> ClaudeEvent {
    serde_json::from_value(value).unwrap()
}

#[test]
fn assistant_message_keeps_block_order() {
    let event = decode(json!({
        "type": "assistant",
        "message": {"content": [
            {"type": "text", "text": "first"},
            {"type": "tool_use", "id": "t1", "name": "Bash", "input": {"command": "ls", "description": "list"}},
            {"type": "thinking", "thinking": "hmm"}
        ]}
    }));

    let ClaudeEvent::Assistant(message) = event else {
        panic!("Expected Assistant");
    };
    assert_eq!(message.content.len(), 3);
    assert!(matches!(&message.content[0], ContentBlock::Text { text } if text == "first"));
    match &message.content[1] {
        ContentBlock::ToolUse(tool) => {
            assert_eq!(tool.name, "Bash");
            let keys: Vec<&str> = tool.input.keys().map(String::as_str).collect();
            assert_eq!(keys, ["command", "description"]);
        }
        other => panic!("Expected ToolUse, got {other:?}"),
    }
    assert!(matches!(&message.content[2], ContentBlock::Other(raw) if raw["type"] == "thinking"));
}

#[test]
fn user_message_with_tool_result() {
    let event = decode(json!({
        "type": "user",
        "message": {"content": [
            {"type": "tool_result", "tool_use_id": "t1", "content": "ok", "is_error": true}
        ]}
    }));

    let ClaudeEvent::User(message) = event else {
        panic!("Expected User");
    };
    match &message.content[0] {
        ContentBlock::ToolResult(result) => {
            assert_eq!(result.tool_use_id.as_deref(), Some("t1"));
            assert_eq!(result.content, json!("ok"));
            assert!(result.is_error);
        }
        other => panic!("Expected ToolResult, got {other:?}"),
    }
}

#[test]
fn result_event_fields() {
    let event = decode(json!({
        "type": "result",
        "subtype": "success",
        "is_error": false,
        "result": "42",
        "total_cost_usd": 0.5,
        "duration_ms": 1200,
        "num_turns": 2,
        "usage": {"input_tokens": 10, "output_tokens": 20, "cache_read_input_tokens": 5},
        "session_id": "abc"
    }));

    let ClaudeEvent::Result(result) = event else {
        panic!("Expected Result");
    };
    assert_eq!(result.session_id.as_deref(), Some("abc"));
    assert!(result.is_success());
    assert_eq!(result.result.as_deref(), Some("42"));
    let usage = result.usage.unwrap();
    assert_eq!((usage.input_tokens, usage.output_tokens), (10, 20));
    assert_eq!(usage.extra["cache_read_input_tokens"], 5);
}

#[test]
fn unknown_kind_is_kept_by_name() {
    let event = decode(json!({"type": "stream_event", "event": {}}));
    assert_eq!(event.kind(), "stream_event");
}

#[test]
fn system_event_is_not_rendered() {
    let event = decode(json!({"type": "system", "subtype": "init", "session_id": "abc"}));
    assert!(matches!(event, ClaudeEvent::System));
    assert_eq!(event.kind(), "system");
}

#[test]
fn non_object_is_rejected() {
    assert!(serde_json::from_str::<ClaudeEvent>("[1, 2]").is_err());
}

#[test]
fn result_with_off_type_fields_is_still_a_result() {
    let event = decode(json!({
        "type": "result",
        "is_error": null,
        "subtype": "success",
        "result": "ok",
        "duration_ms": 10.7,
        "num_turns": -1
    }));

    let ClaudeEvent::Result(result) = event else {
        panic!("Expected Result");
    };
    assert!(result.is_success());
    assert!(!result.is_error);
    assert_eq!(result.duration_ms, Some(11));
    assert_eq!(result.num_turns, None);
}
