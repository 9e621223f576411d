//! Unified error types for the nscope workspace.
//!
//! Discovery itself never fails as a whole: most of these variants describe
//! why a single branch of discovery was skipped. Only
//! [`NscopeError::ProtocolViolation`] signals a bug-level fault.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum NscopeError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Access to a namespace or process was refused, typically because it
    /// lies outside the caller's privileges.
    #[error("permission denied at {path}: {source}")]
    PermissionDenied {
        /// Path that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error (`EACCES` or `EPERM`).
        source: std::io::Error,
    },

    /// Joining a namespace failed, either for lack of privilege or because
    /// the reference went stale.
    #[error("cannot join namespace {reference}: {message}")]
    Join {
        /// Filesystem reference of the namespace that could not be joined.
        reference: String,
        /// Description of the failure.
        message: String,
    },

    /// A re-executed worker terminated unsuccessfully.
    #[error("worker for action {action} failed: {message}")]
    Worker {
        /// Name of the worker action.
        action: String,
        /// Exit status and diagnostics of the worker.
        message: String,
    },

    /// The output stream of a re-executed worker could not be decoded.
    #[error("protocol violation by worker for action {action}: {source}")]
    ProtocolViolation {
        /// Name of the worker action.
        action: String,
        /// Underlying decoding error.
        source: serde_json::Error,
    },

    /// The operation is not available on this platform.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of the unsupported operation.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl NscopeError {
    /// Returns `true` for bug-level worker protocol faults, as opposed to
    /// the expected visibility gaps that discovery silently skips.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Wraps an I/O error together with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Like [`NscopeError::io`], but reports `EACCES` and `EPERM` as
    /// [`NscopeError::PermissionDenied`].
    pub fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path, source }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NscopeError>;
