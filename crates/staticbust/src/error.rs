//! Error taxonomy for path resolution.
//!
//! Filesystem errors are classified exactly once, where they are produced
//! (opening a file, stat-ing it, hashing it). Everything above that layer
//! works with [`ServeError`] and only ever asks for its [`ErrorKind`].

use std::io;

use thiserror::Error;

/// Errors produced while resolving or serving a request path.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Missing file, directory without index, bad root prefix, or a hashed
    /// filename that could not be recovered.
    #[error("not found")]
    NotFound,

    #[error("permission denied: {0}")]
    Forbidden(#[source] io::Error),

    /// The path names something other than a regular file. Used as a signal
    /// to fall back to plain serving; never rendered on its own.
    #[error("not a regular file")]
    NotRegularFile,

    #[error("i/o error: {0}")]
    Io(#[source] io::Error),

    #[error("invalid filename pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// The externally visible error classes, one per error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Internal,
}

impl ServeError {
    /// Map this error onto the handler that renders it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::NotRegularFile => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Io(_) | Self::Pattern(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<io::Error> for ServeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden(err),
            _ => Self::Io(err),
        }
    }
}

pub type Result<T, E = ServeError> = std::result::Result<T, E>;
