//! Tests for stream parsing.

use auto_claude::cli::{ClaudeEvent, StreamError, StreamParser};
use futures_util::StreamExt;

#[test]
fn parse_line_result() {
    let line = r#"{"type":"result","subtype":"success","result":"done"}"#;
    match StreamParser::parse_line(line).unwrap() {
        ClaudeEvent::Result(result) => assert_eq!(result.result.as_deref(), Some("done")),
        other => panic!("Expected Result, got {other:?}"),
    }
}

#[test]
fn parse_line_invalid_json() {
    let line = "not valid json at all";
    match StreamParser::parse_line(line).unwrap_err() {
        StreamError::ParseError { input, reason: _ } => {
            assert_eq!(input, "not valid json at all");
        }
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[tokio::test]
async fn events_skip_malformed_lines_in_order() {
    let input: &[u8] = b"{\"type\":\"system\"}\n\
        garbage {\n\
        \n\
        {\"type\":\"assistant\",\"message\":{\"content\":[]}}\n\
        {\"type\":\"result\",\"subtype\":\"success\",\"result\":\"42\"}\n";

    let events: Vec<ClaudeEvent> = StreamParser::events(input)
        .map(Result::unwrap)
        .collect()
        .await;

    let kinds: Vec<&str> = events.iter().map(ClaudeEvent::kind).collect();
    assert_eq!(kinds, ["system", "assistant", "result"]);
}

#[tokio::test]
async fn events_accept_final_line_without_newline() {
    let input: &[u8] = br#"{"type":"result","subtype":"success","result":"tail"}"#;
    let events: Vec<_> = StreamParser::events(input).collect().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap().kind(), "result");
}
