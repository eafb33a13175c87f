//! Runner module tests.
//!
//! Subprocess behavior is exercised with small shell scripts standing in for
//! the `claude` binary.

mod controller_test;

use std::path::{Path, PathBuf};

/// Write an executable script named `claude` into `dir`.
#[cfg(unix)]
pub fn fake_claude(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("claude");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Terminal output of a recorder as a string.
pub fn terminal_text(recorder: auto_claude::display::Recorder<Vec<u8>>) -> String {
    String::from_utf8(recorder.into_terminal()).unwrap()
}
