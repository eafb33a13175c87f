//! Stream parser for Claude Code stdout.

use futures_core::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::cli::ClaudeEvent;

/// Error type for stream operations.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// Reading from the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A line was not a valid event.
    #[error("Failed to parse JSON: {reason}")]
    ParseError {
        /// The offending line.
        input: String,
        /// Parser message.
        reason: String,
    },
}

/// Parser for newline-delimited stream-json output.
pub struct StreamParser;

impl StreamParser {
    /// Parse a single line of stream-json output.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::ParseError` if the line is not a JSON object
    /// or a known event kind has a malformed body.
    pub fn parse_line(line: &str) -> Result<ClaudeEvent, StreamError> {
        serde_json::from_str(line).map_err(|e| StreamError::ParseError {
            input: line.to_string(),
            reason: e.to_string(),
        })
    }

    /// Turn a reader into an ordered stream of events.
    ///
    /// Blank and malformed lines are dropped; partial writes and diagnostic
    /// noise on stdout are expected. Invalid UTF-8 is replaced rather than
    /// treated as a read failure. Only I/O errors surface as items.
    pub fn events<R>(reader: R) -> impl Stream<Item = Result<ClaudeEvent, StreamError>>
    where
        R: AsyncRead + Unpin,
    {
        futures_util::stream::unfold(BufReader::new(reader), |mut reader| async move {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => return None,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match Self::parse_line(line) {
                            Ok(event) => return Some((Ok(event), reader)),
                            Err(e) => tracing::trace!(error = %e, "Skipping malformed line"),
                        }
                    }
                    Err(e) => return Some((Err(StreamError::Io(e)), reader)),
                }
            }
        })
    }
}
