//! Resource limits for the virtual file system.
//!
//! The workspace lives entirely in process memory, so an editor session that
//! pastes a huge buffer or generates thousands of files can exhaust the host.
//! [`FsLimits`] bounds what the table may hold; every check runs before the
//! table is mutated, so a rejected operation leaves no trace.
//!
//! - `max_file_size`: a single file's content
//! - `max_total_bytes`: all file contents together
//! - `max_file_count`: number of files (directories are not counted)
//! - `max_dir_count`: number of directories, root included
//! - `max_path_depth`, `max_filename_length`, `max_path_length`: address shape

use serde::Serialize;
use thiserror::Error;

use crate::fs::Address;

/// Default maximum total bytes across all files: 100MB
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 100_000_000;

/// Default maximum single file size: 10MB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000_000;

/// Default maximum file count: 10,000
pub const DEFAULT_MAX_FILE_COUNT: u64 = 10_000;

/// Default maximum directory count: 10,000
pub const DEFAULT_MAX_DIR_COUNT: u64 = 10_000;

/// Default maximum path depth (directory nesting): 100
pub const DEFAULT_MAX_PATH_DEPTH: usize = 100;

/// Default maximum filename (single segment) length: 255 bytes
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum total path length: 4096 bytes
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;

/// File system resource limits.
///
/// # Example
///
/// ```rust
/// use scratchfs::{FsLimits, VirtualFileSystem};
///
/// let limits = FsLimits::new()
///     .max_total_bytes(50_000_000)  // 50MB total
///     .max_file_size(5_000_000)     // 5MB per file
///     .max_file_count(1000);        // 1000 files max
///
/// let fs = VirtualFileSystem::builder().limits(limits).build();
/// assert_eq!(fs.limits().max_file_count, 1000);
/// ```
///
/// # Default Limits
///
/// | Limit | Default | Purpose |
/// |-------|---------|---------|
/// | `max_total_bytes` | 100MB | Total content memory |
/// | `max_file_size` | 10MB | Single file size |
/// | `max_file_count` | 10,000 | Number of files |
/// | `max_dir_count` | 10,000 | Number of directories |
/// | `max_path_depth` | 100 | Directory nesting depth |
/// | `max_filename_length` | 255 | Single path segment |
/// | `max_path_length` | 4096 | Total path length |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsLimits {
    /// Maximum total bytes across all files.
    pub max_total_bytes: u64,

    /// Maximum size of a single file in bytes.
    pub max_file_size: u64,

    /// Maximum number of files (not including directories).
    pub max_file_count: u64,

    /// Maximum number of directories, root included.
    pub max_dir_count: u64,

    /// Maximum directory nesting depth.
    pub max_path_depth: usize,

    /// Maximum length of a single path segment in bytes.
    pub max_filename_length: usize,

    /// Maximum total path length in bytes.
    pub max_path_length: usize,
}

impl Default for FsLimits {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            max_dir_count: DEFAULT_MAX_DIR_COUNT,
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl FsLimits {
    /// Create new limits with defaults.
    ///
    /// ```rust
    /// use scratchfs::FsLimits;
    ///
    /// let limits = FsLimits::new();
    /// assert_eq!(limits.max_total_bytes, 100_000_000);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Create limits that never reject anything.
    pub fn unlimited() -> Self {
        Self {
            max_total_bytes: u64::MAX,
            max_file_size: u64::MAX,
            max_file_count: u64::MAX,
            max_dir_count: u64::MAX,
            max_path_depth: usize::MAX,
            max_filename_length: usize::MAX,
            max_path_length: usize::MAX,
        }
    }

    /// Set maximum total bytes.
    pub fn max_total_bytes(mut self, bytes: u64) -> Self {
        self.max_total_bytes = bytes;
        self
    }

    /// Set maximum single file size.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set maximum file count.
    pub fn max_file_count(mut self, count: u64) -> Self {
        self.max_file_count = count;
        self
    }

    /// Set maximum directory count.
    pub fn max_dir_count(mut self, count: u64) -> Self {
        self.max_dir_count = count;
        self
    }

    /// Set maximum path depth.
    pub fn max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    /// Set maximum path segment length.
    pub fn max_filename_length(mut self, len: usize) -> Self {
        self.max_filename_length = len;
        self
    }

    /// Set maximum total path length.
    pub fn max_path_length(mut self, len: usize) -> Self {
        self.max_path_length = len;
        self
    }

    /// Validate an address against depth, length and character limits.
    pub fn validate_address(&self, address: &Address) -> Result<(), FsLimitExceeded> {
        let path = address.as_str();
        if path.len() > self.max_path_length {
            return Err(FsLimitExceeded::PathTooLong {
                length: path.len(),
                limit: self.max_path_length,
            });
        }

        let mut depth = 0usize;
        for segment in address.segments() {
            if segment.len() > self.max_filename_length {
                return Err(FsLimitExceeded::FilenameTooLong {
                    length: segment.len(),
                    limit: self.max_filename_length,
                });
            }
            if let Some(bad_char) = find_unsafe_path_char(segment) {
                return Err(FsLimitExceeded::UnsafePathChar {
                    character: bad_char,
                    component: segment.to_string(),
                });
            }
            depth += 1;
        }

        if depth > self.max_path_depth {
            return Err(FsLimitExceeded::PathTooDeep {
                depth,
                limit: self.max_path_depth,
            });
        }

        Ok(())
    }

    /// Check if adding bytes would exceed the total limit.
    pub fn check_total_bytes(&self, current: u64, additional: u64) -> Result<(), FsLimitExceeded> {
        let new_total = current.saturating_add(additional);
        if new_total > self.max_total_bytes {
            return Err(FsLimitExceeded::TotalBytes {
                current,
                additional,
                limit: self.max_total_bytes,
            });
        }
        Ok(())
    }

    /// Check a single file size.
    pub fn check_file_size(&self, size: u64) -> Result<(), FsLimitExceeded> {
        if size > self.max_file_size {
            return Err(FsLimitExceeded::FileSize {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check that `additional` more files fit next to `current`.
    pub fn check_file_count(&self, current: u64, additional: u64) -> Result<(), FsLimitExceeded> {
        if current.saturating_add(additional) > self.max_file_count {
            return Err(FsLimitExceeded::FileCount {
                current,
                limit: self.max_file_count,
            });
        }
        Ok(())
    }

    /// Check that `additional` more directories fit next to `current`.
    pub fn check_dir_count(&self, current: u64, additional: u64) -> Result<(), FsLimitExceeded> {
        if current.saturating_add(additional) > self.max_dir_count {
            return Err(FsLimitExceeded::DirCount {
                current,
                limit: self.max_dir_count,
            });
        }
        Ok(())
    }
}

/// Returns a description of the first control or bidi-override character.
fn find_unsafe_path_char(name: &str) -> Option<String> {
    for ch in name.chars() {
        if ch.is_ascii_control() || ('\u{0080}'..='\u{009F}').contains(&ch) {
            return Some(format!("U+{:04X}", ch as u32));
        }
        if ('\u{202A}'..='\u{202E}').contains(&ch) || ('\u{2066}'..='\u{2069}').contains(&ch) {
            return Some(format!("U+{:04X} (bidi override)", ch as u32));
        }
    }
    None
}

/// Error returned when a file system limit is exceeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsLimitExceeded {
    #[error("file system full: {current} + {additional} bytes exceeds {limit} byte limit")]
    TotalBytes {
        current: u64,
        additional: u64,
        limit: u64,
    },

    #[error("file too large: {size} bytes exceeds {limit} byte limit")]
    FileSize { size: u64, limit: u64 },

    #[error("too many files: {current} files at {limit} file limit")]
    FileCount { current: u64, limit: u64 },

    #[error("too many directories: {current} directories at {limit} directory limit")]
    DirCount { current: u64, limit: u64 },

    #[error("path too deep: {depth} levels exceeds {limit} level limit")]
    PathTooDeep { depth: usize, limit: usize },

    #[error("filename too long: {length} bytes exceeds {limit} byte limit")]
    FilenameTooLong { length: usize, limit: usize },

    #[error("path too long: {length} bytes exceeds {limit} byte limit")]
    PathTooLong { length: usize, limit: usize },

    #[error("unsafe character {character} in path component '{component}'")]
    UnsafePathChar {
        character: String,
        component: String,
    },
}

/// Current usage of the file system.
///
/// Returned by [`VirtualFileSystem::usage`](crate::VirtualFileSystem::usage).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FsUsage {
    /// Total bytes held by file contents.
    pub total_bytes: u64,
    /// Number of files.
    pub file_count: u64,
    /// Number of directories, root included.
    pub dir_count: u64,
}
