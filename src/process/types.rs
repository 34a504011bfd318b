/*!
 * Process Types
 * Common types for emulated process management
 */

use crate::core::types::{Address, Gid, Pid, Uid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Process not found: {0}")]
    ProcessNotFound(Pid),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Image malformed: {0}")]
    ImageMalformed(#[from] crate::elf::LoaderError),

    #[error("Break below start: requested {requested:#x}, start {start:#x}")]
    BrkBelowStart { requested: Address, start: Address },

    #[error("Native collaborator failed: {0}")]
    NativeFailure(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

/// Process state machine: Created -> Running -> (Exited | Replaced).
/// Replaced re-enters Running once the new image is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Context exists, first instruction not yet executed
    Created,
    /// Process is executing foreign code
    Running,
    /// Terminal state, reached via exit or an unrecoverable fault
    Exited,
    /// Image discarded by a successful execve; same pid, same fd table
    Replaced,
}

impl ProcessState {
    /// Check whether a transition is legal
    #[inline]
    #[must_use]
    pub const fn can_transition_to(self, to: ProcessState) -> bool {
        matches!(
            (self, to),
            (ProcessState::Created, ProcessState::Running)
                | (ProcessState::Created, ProcessState::Exited)
                | (ProcessState::Running, ProcessState::Exited)
                | (ProcessState::Running, ProcessState::Replaced)
                | (ProcessState::Replaced, ProcessState::Running)
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Exited)
    }
}

/// Credential block of an emulated process.
/// Real and effective ids are assigned at creation; only the effective pair
/// may change later, via privilege-changing syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Credentials {
    pub uid: Uid,
    pub gid: Gid,
    pub euid: Uid,
    pub egid: Gid,
}

impl Credentials {
    #[inline]
    #[must_use]
    pub const fn new(uid: Uid, gid: Gid) -> Self {
        Self {
            uid,
            gid,
            euid: uid,
            egid: gid,
        }
    }

    /// Superuser credentials
    #[inline]
    #[must_use]
    pub const fn root() -> Self {
        Self::new(0, 0)
    }
}

/// Signal handler slot.
/// Recording only at this layer; delivery is the native scheduler's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDisposition {
    #[default]
    Default,
    Ignore,
    /// Foreign handler entry address, recorded verbatim
    Handler(Address),
}
