/*!
 * Native Collaborator Traits
 *
 * Capability interfaces the persona consumes from the native kernel: file
 * resolution (VFS), address-space mapping (VMM), and process scheduling.
 * Each trait has a host-backed implementation and an in-memory fake so the
 * persona can be tested in isolation.
 */

use crate::core::types::{Address, NativePid, VfsHandle};
use thiserror::Error;

/// VFS collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("bad handle: {0}")]
    BadHandle(VfsHandle),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

pub type VfsResult<T> = Result<T, VfsError>;

/// VMM collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmmError {
    #[error("out of memory mapping {size:#x} bytes at {base:#x}")]
    OutOfMemory { base: Address, size: u64 },

    #[error("bad range: base {base:#x}, size {size:#x}")]
    BadRange { base: Address, size: u64 },
}

pub type VmmResult<T> = Result<T, VmmError>;

/// Scheduler collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    #[error("scheduler rejected the request: {0}")]
    Rejected(String),

    #[error("unknown native pid {0}")]
    UnknownProcess(NativePid),
}

pub type SchedResult<T> = Result<T, SchedError>;

/// Mapping attributes for VMM requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapAttrs {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl MapAttrs {
    /// Read/write data mapping (heap pages)
    #[inline]
    #[must_use]
    pub const fn rw() -> Self {
        Self {
            read: true,
            write: true,
            execute: false,
        }
    }

    /// Read/execute mapping (image text)
    #[inline]
    #[must_use]
    pub const fn rx() -> Self {
        Self {
            read: true,
            write: false,
            execute: true,
        }
    }

    /// Fully permissive mapping (whole-image envelope; per-segment
    /// protection is the VMM's refinement)
    #[inline]
    #[must_use]
    pub const fn rwx() -> Self {
        Self {
            read: true,
            write: true,
            execute: true,
        }
    }
}

/// Native virtual file system.
///
/// Handles 0/1/2 are reserved for the standard streams; `open_path` never
/// returns them.
pub trait Vfs: Send + Sync {
    /// Resolve a path into an open handle.
    fn open_path(&self, path: &str, flags: u32, mode: u32) -> VfsResult<VfsHandle>;

    /// Read up to `len` bytes from a handle. An empty result means EOF.
    fn read(&self, handle: VfsHandle, len: u64) -> VfsResult<Vec<u8>>;

    /// Write bytes to a handle, returning the count written.
    fn write(&self, handle: VfsHandle, data: &[u8]) -> VfsResult<u64>;

    /// Close a handle. Closing a console handle is a no-op.
    fn close(&self, handle: VfsHandle) -> VfsResult<()>;

    /// Read an entire file (image loading path).
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Check whether a path resolves.
    fn exists(&self, path: &str) -> bool;

    /// Implementation name, for logs.
    fn name(&self) -> &'static str;
}

/// Native virtual memory manager.
pub trait Vmm: Send + Sync {
    /// Map `size` bytes at `base` with the given attributes.
    fn map(&self, base: Address, size: u64, attrs: MapAttrs) -> VmmResult<()>;

    /// Unmap `size` bytes at `base`.
    fn unmap(&self, base: Address, size: u64) -> VmmResult<()>;
}

/// Native scheduler.
pub trait NativeScheduler: Send + Sync {
    /// Create a native process shell to host a foreign context.
    fn create_process(&self) -> SchedResult<NativePid>;

    /// Yield the calling thread of control.
    fn yield_now(&self);

    /// Terminate a native process with an exit status.
    fn terminate(&self, native: NativePid, status: i64) -> SchedResult<()>;
}
