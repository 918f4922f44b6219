//! Error types for scratchfs
//!
//! This module provides error types for the virtual file system with the following design goals:
//! - Messages shaped like POSIX errno text so editor layers can surface them as-is
//! - Clear categorization for programmatic handling via [`Error::kind`]
//! - No partial success: every error is raised before the table is mutated

use crate::limits::FsLimitExceeded;
use thiserror::Error;

/// Result type alias using scratchfs's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// scratchfs error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No entry exists at the address.
    #[error("ENOENT: no such file or directory, '{path}'")]
    NotFound { path: String },

    /// A file was expected but a directory was found.
    #[error("EISDIR: illegal operation on a directory, '{path}'")]
    IsADirectory { path: String },

    /// A directory was expected but a file was found.
    #[error("ENOTDIR: not a directory, '{path}'")]
    NotADirectory { path: String },

    /// The parent directory required by the operation is missing or is a file.
    #[error("ENOENT: parent directory does not exist, '{path}'")]
    ParentMissing { path: String },

    /// The destination is already occupied.
    #[error("EEXIST: file already exists, '{path}'")]
    AlreadyExists { path: String },

    /// Non-recursive delete of a directory that still has children.
    #[error("ENOTEMPTY: directory not empty, '{path}'")]
    NotEmpty { path: String },

    /// The provider does not implement the operation.
    #[error("ENOSYS: operation not supported, {operation}")]
    Unsupported { operation: String },

    /// The operation is well-formed but would break a structural invariant.
    #[error("EINVAL: {reason}, '{path}'")]
    InvalidOperation { path: String, reason: String },

    /// The address cannot be normalized.
    #[error("EINVAL: invalid path ({reason}), '{path}'")]
    InvalidPath { path: String, reason: String },

    /// Resource limit exceeded.
    #[error("resource limit exceeded: {0}")]
    LimitExceeded(#[from] FsLimitExceeded),
}

/// Fieldless error category, for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    /// Covers both [`Error::IsADirectory`] and [`Error::NotADirectory`].
    WrongKind,
    ParentMissing,
    AlreadyExists,
    NotEmpty,
    Unsupported,
    Invalid,
    LimitExceeded,
}

impl Error {
    pub(crate) fn not_found(path: impl ToString) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn is_a_directory(path: impl ToString) -> Self {
        Self::IsADirectory {
            path: path.to_string(),
        }
    }

    pub(crate) fn not_a_directory(path: impl ToString) -> Self {
        Self::NotADirectory {
            path: path.to_string(),
        }
    }

    pub(crate) fn parent_missing(path: impl ToString) -> Self {
        Self::ParentMissing {
            path: path.to_string(),
        }
    }

    pub(crate) fn already_exists(path: impl ToString) -> Self {
        Self::AlreadyExists {
            path: path.to_string(),
        }
    }

    pub(crate) fn not_empty(path: impl ToString) -> Self {
        Self::NotEmpty {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_operation(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::IsADirectory { .. } | Error::NotADirectory { .. } => ErrorKind::WrongKind,
            Error::ParentMissing { .. } => ErrorKind::ParentMissing,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::NotEmpty { .. } => ErrorKind::NotEmpty,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::InvalidOperation { .. } | Error::InvalidPath { .. } => ErrorKind::Invalid,
            Error::LimitExceeded(_) => ErrorKind::LimitExceeded,
        }
    }

    /// Shorthand for `kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind as Io;
        let kind = match &err {
            Error::NotFound { .. } | Error::ParentMissing { .. } => Io::NotFound,
            Error::IsADirectory { .. } => Io::IsADirectory,
            Error::NotADirectory { .. } => Io::NotADirectory,
            Error::AlreadyExists { .. } => Io::AlreadyExists,
            Error::NotEmpty { .. } => Io::DirectoryNotEmpty,
            Error::Unsupported { .. } => Io::Unsupported,
            Error::InvalidOperation { .. } | Error::InvalidPath { .. } => Io::InvalidInput,
            Error::LimitExceeded(_) => Io::StorageFull,
        };
        std::io::Error::new(kind, err)
    }
}
