//! Tests for Claude process spawning.

use auto_claude::cli::{ClaudeProcess, ClaudeProcessBuilder, SpawnError, STREAM_FLAGS};

#[test]
fn builder_prepends_stream_flags() {
    let builder = ClaudeProcessBuilder::default().options(["--model", "opus"]);
    let args = builder.build_args();

    assert_eq!(&args[..4], STREAM_FLAGS);
    assert_eq!(&args[4..], ["--model", "opus"]);
    assert_eq!(builder.binary(), "claude");
}

#[test]
fn builder_never_passes_prompt_as_argument() {
    let builder = ClaudeProcessBuilder::new("claude");
    assert_eq!(builder.build_args(), STREAM_FLAGS);
}

#[tokio::test]
async fn spawn_missing_binary_is_not_found() {
    let builder = ClaudeProcessBuilder::new("/nonexistent/auto-claude-test-binary");
    match ClaudeProcess::spawn(&builder) {
        Err(SpawnError::NotFound(binary)) => {
            assert_eq!(binary, "/nonexistent/auto-claude-test-binary");
        }
        Err(other) => panic!("Expected NotFound, got {other:?}"),
        Ok(_) => panic!("Expected spawn failure"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn spawn_pipes_stdout() {
    use tokio::io::AsyncReadExt;

    let builder = ClaudeProcessBuilder::new("echo");
    let mut process = ClaudeProcess::spawn(&builder).unwrap();
    let mut stdout = process.take_stdout().unwrap();
    let mut out = String::new();
    stdout.read_to_string(&mut out).await.unwrap();
    assert!(process.wait().await.unwrap().success());
    assert_eq!(out.trim(), "-p --verbose --output-format stream-json");
}
