//! Error type shared by every area of the object database
//!
//! All fallible operations return [`Result`]. Parsers never hand back a
//! partially decoded value: any failure while decoding bytes becomes
//! [`Error::Corrupt`] with a human-readable cause.

use crate::artifacts::objects::object_id::ObjectId;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification of an [`Error`], convenient for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Corrupt,
    Ambiguous,
    InvalidSpec,
    Unsupported,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    /// No such object, ref or path
    #[error("not found: {0}")]
    NotFound(String),

    /// Bytes on disk do not decode into a well-formed value
    #[error("corrupt object: {0}")]
    Corrupt(String),

    /// A short object id matches more than one object
    #[error("short object id {prefix} is ambiguous ({} candidates)", .candidates.len())]
    Ambiguous {
        prefix: String,
        candidates: Vec<ObjectId>,
    },

    /// Revision grammar violation or an operator applied to the wrong object
    #[error("invalid revision: {0}")]
    InvalidSpec(String),

    /// Unknown object type tag in a header
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn corrupt(cause: impl Into<String>) -> Self {
        Error::Corrupt(cause.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn invalid_spec(cause: impl Into<String>) -> Self {
        Error::InvalidSpec(cause.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::Ambiguous { .. } => ErrorKind::Ambiguous,
            Error::InvalidSpec(_) => ErrorKind::InvalidSpec,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Prefix a corruption cause with the object or file it came from
    pub(crate) fn within(self, location: impl std::fmt::Display) -> Self {
        match self {
            Error::Corrupt(cause) => Error::Corrupt(format!("{location}: {cause}")),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_mention_the_path() {
        let error = Error::io(
            "/tmp/repo/.git/objects/ab/cdef",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("/tmp/repo/.git/objects/ab/cdef"));
    }

    #[test]
    fn within_only_decorates_corruption() {
        let corrupt = Error::corrupt("size mismatch").within("blob 1234");
        assert_eq!(corrupt.to_string(), "corrupt object: blob 1234: size mismatch");

        let missing = Error::not_found("HEAD").within("ignored");
        assert_eq!(missing.to_string(), "not found: HEAD");
    }
}
