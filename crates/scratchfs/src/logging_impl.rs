//! Logging support for scratchfs
//!
//! The file system emits structured events through the `tracing` crate;
//! installing a subscriber is left to the embedding application.
//!
//! # Log Levels
//!
//! - **WARN**: a watcher callback panicked (the operation still succeeds)
//! - **DEBUG**: every mutation: create, write, append, delete, rename, copy
//! - **TRACE**: reads, listings, watcher registration and event delivery
//!
//! Paths come from the editor and may contain anything, so they are escaped
//! before they reach a log line. File contents are never logged unless
//! [`LogConfig::log_file_contents`] is set.

use std::borrow::Cow;

/// Default maximum length of a logged value
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 200;

/// Configuration for logging behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether to include file contents in debug logs (default: false)
    pub log_file_contents: bool,

    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file_contents: false,
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Include file contents in logs
    ///
    /// # Warning
    ///
    /// Editor buffers may hold credentials or other private text.
    pub fn unsafe_log_file_contents(mut self) -> Self {
        self.log_file_contents = true;
        self
    }

    /// Set maximum length for logged values
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Truncate value if it exceeds max length, on a char boundary.
    pub fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            Cow::Borrowed(value)
        } else {
            let mut end = self.max_value_length;
            while end > 0 && !value.is_char_boundary(end) {
                end -= 1;
            }
            Cow::Owned(format!(
                "{}...[truncated {} bytes]",
                &value[..end],
                value.len() - end
            ))
        }
    }
}

/// Escape characters that could forge extra log lines.
pub fn sanitize_for_log(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
            .chars()
            .filter(|c| !c.is_control())
            .collect(),
    )
}

/// Format file content for a log line.
///
/// Without [`LogConfig::log_file_contents`] only the byte count is shown.
pub fn format_content_for_log(content: &[u8], config: &LogConfig) -> String {
    if !config.log_file_contents {
        return format!("[{} bytes]", content.len());
    }
    let text = String::from_utf8_lossy(content);
    let sanitized = sanitize_for_log(&text);
    config.truncate(&sanitized).into_owned()
}
