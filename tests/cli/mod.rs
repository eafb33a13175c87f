//! CLI module tests.

mod events_test;
mod process_test;
mod stream_test;

/// Verify the public CLI types are exported from the library.
#[test]
fn test_all_cli_types_exported() {
    use auto_claude::cli::{
        ClaudeEvent, ClaudeProcessBuilder, ContentBlock, Message, ResultEvent, SpawnError,
        StreamError, StreamParser, ToolResult, ToolUse, Usage, DEFAULT_BINARY, STREAM_FLAGS,
    };

    let _ = ClaudeProcessBuilder::new(DEFAULT_BINARY);
    let _ = ResultEvent::default();
    let _ = Message::default();
    let _ = Usage::default();
    let _ = ToolUse::default();
    let _ = ToolResult::default();
    let _ = ContentBlock::Text {
        text: String::new(),
    };
    let _ = ClaudeEvent::System;
    let _: fn(&str) -> Result<ClaudeEvent, StreamError> = StreamParser::parse_line;
    let _: fn() -> SpawnError = || SpawnError::NotFound("claude".to_string());
    assert_eq!(STREAM_FLAGS.len(), 4);
}
