//! Tests for the retry/resume loop against a scripted CLI.
#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use auto_claude::display::Recorder;
use auto_claude::error::RunError;
use auto_claude::format::TranscriptFormatter;
use auto_claude::runner::{RunConfig, RunController};

use super::{fake_claude, terminal_text};

/// Fails with session `abc` on the first call, succeeds afterwards.
/// Every call appends its arguments to `args.txt`.
fn flaky_claude(dir: &Path) -> String {
    let body = format!(
        r#"echo "$@" >> '{dir}/args.txt'
cat > /dev/null
if [ ! -f '{dir}/marker' ]; then
  touch '{dir}/marker'
  echo '{{"type":"result","is_error":true,"error":{{"message":"overloaded"}},"session_id":"abc"}}'
else
  echo '{{"type":"result","subtype":"success","result":"recovered","session_id":"abc"}}'
fi"#,
        dir = dir.display()
    );
    fake_claude(dir, &body).to_string_lossy().into_owned()
}

fn config(binary: String) -> RunConfig {
    let mut config = RunConfig::default().retry(true);
    config.claude_binary = binary;
    config.retry_delay = Duration::from_millis(10);
    config
}

fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn retry_resumes_recovered_session() {
    let dir = tempfile::tempdir().unwrap();
    let binary = flaky_claude(dir.path());
    let mut controller = RunController::new(
        config(binary).options(vec!["--model".into(), "opus".into()]),
        Recorder::new(Vec::new()),
        TranscriptFormatter::new(),
    );

    assert_eq!(controller.run("hi").await.unwrap(), "recovered");

    let args = recorded_args(dir.path());
    assert_eq!(args.len(), 2);
    assert_eq!(args[0], "-p --verbose --output-format stream-json --model opus");
    assert_eq!(
        args[1],
        "-p --verbose --output-format stream-json --model opus --resume abc"
    );

    let out = terminal_text(controller.into_recorder());
    assert!(out.contains("  Error occurred: Claude error: overloaded"));
    assert!(out.contains("  Retrying with --resume abc (attempt 2/3)..."));
}

#[tokio::test]
async fn explicit_resume_is_not_duplicated() {
    let dir = tempfile::tempdir().unwrap();
    let binary = flaky_claude(dir.path());
    let mut controller = RunController::new(
        config(binary).options(vec!["--resume".into(), "mine".into()]),
        Recorder::new(Vec::new()),
        TranscriptFormatter::new(),
    );

    assert_eq!(controller.run("hi").await.unwrap(), "recovered");

    let args = recorded_args(dir.path());
    assert_eq!(args.len(), 2);
    assert!(args.iter().all(|line| line.ends_with("--resume mine")));
    assert!(!terminal_text(controller.into_recorder()).contains("Retrying with"));
}

#[tokio::test]
async fn without_retry_first_failure_is_final() {
    let dir = tempfile::tempdir().unwrap();
    let binary = flaky_claude(dir.path());
    let mut controller = RunController::new(
        config(binary).retry(false),
        Recorder::new(Vec::new()),
        TranscriptFormatter::new(),
    );

    let err = controller.run("hi").await.unwrap_err();
    assert!(matches!(err, RunError::Reported(ref msg) if msg == "overloaded"));
    assert_eq!(recorded_args(dir.path()).len(), 1);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        r#"echo "$@" >> '{dir}/args.txt'
cat > /dev/null
echo '{{"type":"result","is_error":true,"session_id":"abc"}}'"#,
        dir = dir.path().display()
    );
    let binary = fake_claude(dir.path(), &body).to_string_lossy().into_owned();
    let mut controller = RunController::new(
        config(binary),
        Recorder::new(Vec::new()),
        TranscriptFormatter::new(),
    );

    let err = controller.run("hi").await.unwrap_err();
    assert_eq!(err.to_string(), "Claude error: Unknown error");

    let args = recorded_args(dir.path());
    assert_eq!(args.len(), 3);
    assert_eq!(args.iter().filter(|line| line.contains("--resume abc")).count(), 2);
}

#[tokio::test]
async fn spawn_failure_is_not_retried() {
    let mut controller = RunController::new(
        config("/nonexistent/auto-claude-binary".to_string()),
        Recorder::new(Vec::new()),
        TranscriptFormatter::new(),
    );

    let err = controller.run("hi").await.unwrap_err();
    assert!(matches!(err, RunError::Spawn(_)));
    let out = terminal_text(controller.into_recorder());
    assert!(!out.contains("Error occurred"));
}

#[tokio::test]
async fn log_file_ends_with_single_metadata_line() {
    let dir = tempfile::tempdir().unwrap();
    let binary = flaky_claude(dir.path());
    let log_path = dir.path().join("run.log");

    let mut recorder = Recorder::new(Vec::new());
    assert!(recorder.open_log(&log_path));
    let mut controller = RunController::new(config(binary), recorder, TranscriptFormatter::new());
    controller.run("hi").await.unwrap();
    assert!(controller.recorder().log_path().is_none());

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    let metadata_lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.starts_with('{'))
        .collect();
    assert_eq!(metadata_lines.len(), 1);
    assert_eq!(lines.last(), metadata_lines.last());

    let record: serde_json::Value = serde_json::from_str(metadata_lines[0]).unwrap();
    assert_eq!(record["success"], true);
    assert_eq!(record["session_id"], "abc");
    assert!(log.contains(&format!("  Log file: {}", log_path.display())));
    assert!(!log.contains("Retrying with"));
}

#[tokio::test]
async fn log_metadata_comes_from_the_final_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        r#"echo "$@" >> '{dir}/args.txt'
cat > /dev/null
if [ ! -f '{dir}/marker' ]; then
  touch '{dir}/marker'
  echo '{{"type":"result","is_error":true,"error":{{"message":"overloaded"}},"session_id":"abc"}}'
fi"#,
        dir = dir.path().display()
    );
    let binary = fake_claude(dir.path(), &body).to_string_lossy().into_owned();
    let log_path = dir.path().join("run.log");

    let mut recorder = Recorder::new(Vec::new());
    assert!(recorder.open_log(&log_path));
    let mut controller = RunController::new(config(binary), recorder, TranscriptFormatter::new());
    assert_eq!(controller.run("hi").await.unwrap(), "");

    let args = recorded_args(dir.path());
    assert_eq!(args.len(), 2);
    assert!(args[1].ends_with("--resume abc"));

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("overloaded"), "stale metadata in log: {log}");
    assert!(log.lines().all(|line| !line.starts_with('{')));
    assert_eq!(log.lines().last(), Some("  ---"));
}
