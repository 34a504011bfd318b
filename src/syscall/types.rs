/*!
 * Syscall Types
 * Argument bundle, error taxonomy, and errno mapping for dispatch
 */

use crate::abi::user::UserMemError;
use crate::abi::Errno;
use crate::native::traits::{SchedError, VfsError, VmmError};
use crate::process::types::ProcessError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six word-sized arguments of a foreign syscall, as they arrive in
/// registers. Unused trailing arguments are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyscallArgs(pub [u64; 6]);

impl SyscallArgs {
    #[inline]
    #[must_use]
    pub const fn new(args: [u64; 6]) -> Self {
        Self(args)
    }

    #[inline]
    #[must_use]
    pub const fn arg(&self, i: usize) -> u64 {
        self.0[i]
    }
}

impl From<[u64; 6]> for SyscallArgs {
    fn from(args: [u64; 6]) -> Self {
        Self(args)
    }
}

/// Handler outcome before ABI encoding.
pub type HandlerResult = Result<i64, SyscallError>;

/// Syscall error taxonomy. The dispatcher encodes each variant as the
/// negated foreign errno; nothing here ever aborts the hosting process.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "error_type", content = "details")]
#[non_exhaustive]
pub enum SyscallError {
    /// Argument outside the contract (EINVAL)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bad pointer-shaped argument (EFAULT)
    #[error("Fault: {0}")]
    Fault(String),

    /// Descriptor inactive or out of range (EBADF)
    #[error("Bad descriptor: {0}")]
    BadDescriptor(u64),

    /// Resource limit reached (EMFILE)
    #[error("Exhausted: {0}")]
    Exhausted(String),

    /// Recognized but not yet backed by a collaborator (ENOSYS).
    /// A first-class outcome during bring-up, not a fault.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Image failed to parse (ENOEXEC)
    #[error("Malformed image: {0}")]
    Malformed(String),

    /// Path did not resolve (ENOENT)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path exceeds the foreign limit (ENAMETOOLONG)
    #[error("Path too long: {0}")]
    PathTooLong(String),

    /// Result does not fit the caller's buffer (ERANGE)
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Collaborator I/O failure (EIO)
    #[error("I/O error: {0}")]
    Io(String),

    /// Native memory exhausted (ENOMEM)
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Caller lacks the required privilege (EPERM)
    #[error("Not permitted: {0}")]
    NotPermitted(String),
}

impl SyscallError {
    /// Create an invalid argument error
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a fault error
    #[inline]
    pub fn fault(msg: impl Into<String>) -> Self {
        Self::Fault(msg.into())
    }

    /// Create a not implemented error
    #[inline]
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// The foreign errno this variant encodes to.
    #[must_use]
    pub const fn errno(&self) -> Errno {
        match self {
            Self::InvalidArgument(_) => Errno::Einval,
            Self::Fault(_) => Errno::Efault,
            Self::BadDescriptor(_) => Errno::Ebadf,
            Self::Exhausted(_) => Errno::Emfile,
            Self::NotImplemented(_) => Errno::Enosys,
            Self::Malformed(_) => Errno::Enoexec,
            Self::NotFound(_) => Errno::Enoent,
            Self::PathTooLong(_) => Errno::Enametoolong,
            Self::OutOfRange(_) => Errno::Erange,
            Self::Io(_) => Errno::Eio,
            Self::OutOfMemory(_) => Errno::Enomem,
            Self::NotPermitted(_) => Errno::Eperm,
        }
    }

    /// Expected during incremental bring-up; logged apart from real faults.
    #[inline]
    #[must_use]
    pub const fn is_expected_gap(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

impl From<UserMemError> for SyscallError {
    fn from(err: UserMemError) -> Self {
        match err {
            UserMemError::BadEncoding => Self::InvalidArgument(err.to_string()),
            UserMemError::Unterminated(_) => Self::PathTooLong(err.to_string()),
            other => Self::Fault(other.to_string()),
        }
    }
}

impl From<VfsError> for SyscallError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::NotFound(path) => Self::NotFound(path),
            VfsError::PermissionDenied(path) => Self::NotPermitted(path),
            VfsError::BadHandle(handle) => Self::BadDescriptor(handle),
            VfsError::NotSupported(what) => Self::NotImplemented(what),
            VfsError::Io(msg) => Self::Io(msg),
        }
    }
}

impl From<VmmError> for SyscallError {
    fn from(err: VmmError) -> Self {
        match err {
            VmmError::OutOfMemory { .. } => Self::OutOfMemory(err.to_string()),
            VmmError::BadRange { .. } => Self::InvalidArgument(err.to_string()),
        }
    }
}

impl From<SchedError> for SyscallError {
    fn from(err: SchedError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<ProcessError> for SyscallError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::ProcessNotFound(_) => Self::InvalidArgument(err.to_string()),
            ProcessError::ImageNotFound(path) => Self::NotFound(path),
            ProcessError::ImageMalformed(e) => Self::Malformed(e.to_string()),
            ProcessError::InvalidPath(path) => Self::InvalidArgument(path),
            ProcessError::BrkBelowStart { .. } => Self::InvalidArgument(err.to_string()),
            ProcessError::NotImplemented(what) => Self::NotImplemented(what.to_string()),
            ProcessError::InvalidStateTransition { .. } => Self::InvalidArgument(err.to_string()),
            ProcessError::NativeFailure(msg) => Self::Io(msg),
        }
    }
}
