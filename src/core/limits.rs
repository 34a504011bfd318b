/*!
 * Persona Limits and Constants
 *
 * Centralized location for the fixed limits the foreign ABI imposes on an
 * emulated process. Values the foreign ABI pins exactly are marked
 * [LINUX-COMPAT].
 */

use crate::core::types::{Address, Fd, Pid, VfsHandle};

// =============================================================================
// FILE DESCRIPTOR TABLE
// =============================================================================

/// Per-process file descriptor table capacity
/// The foreign ABI fixes this limit; the table never resizes
pub const MAX_FDS: usize = 256;

/// First descriptor the generic allocator may hand out
/// 0/1/2 are seeded as stdin/stdout/stderr and reserved
pub const FIRST_ALLOCATABLE_FD: Fd = 3;

/// Standard input descriptor
pub const STDIN_FD: Fd = 0;

/// Standard output descriptor
pub const STDOUT_FD: Fd = 1;

/// Standard error descriptor
pub const STDERR_FD: Fd = 2;

// =============================================================================
// PROCESS IDENTITY
// =============================================================================

/// First pid the registry hands out
/// Pids below this are reserved for native-kernel bookkeeping
pub const PID_BASE: Pid = 16;

// =============================================================================
// SIGNALS
// =============================================================================

/// Signal handler slot count (signals 1..=64)
/// [LINUX-COMPAT] Matches the Linux real-time signal range
pub const MAX_SIGNALS: usize = 64;

// =============================================================================
// PATHS AND USER MEMORY
// =============================================================================

/// Maximum path length in bytes, including the NUL terminator
/// [LINUX-COMPAT] Matches Linux PATH_MAX
pub const PATH_MAX: usize = 4096;

/// Maximum length of a single user buffer per read/write call (128MB)
/// Larger length arguments are treated as bad pointers
pub const MAX_USER_IO: usize = 128 * 1024 * 1024;

/// Maximum argv/envp entries accepted by execve
pub const MAX_ARG_STRINGS: usize = 1024;

// =============================================================================
// ADDRESS SPACE
// =============================================================================

/// Default heap base for a context created without an image (64MB)
pub const DEFAULT_BRK_BASE: Address = 0x0400_0000;

/// Guest page size
/// [LINUX-COMPAT] 4KB pages on x86-64
pub const PAGE_SIZE: u64 = 4096;

// =============================================================================
// CONSOLE HANDLES
// =============================================================================

/// Reserved VFS handles wired to the standard streams.
/// Both collaborator implementations special-case these.
pub const CONSOLE_STDIN: VfsHandle = 0;
pub const CONSOLE_STDOUT: VfsHandle = 1;
pub const CONSOLE_STDERR: VfsHandle = 2;

/// First handle a VFS implementation may allocate for opened files
pub const FIRST_FILE_HANDLE: VfsHandle = 3;

/// Round an address up to the next page boundary.
/// None when the rounded value does not fit in the address space; callers
/// turn that into an errno, never a panic.
#[inline]
#[must_use]
pub const fn page_align_up(addr: u64) -> Option<u64> {
    match addr.checked_add(PAGE_SIZE - 1) {
        Some(v) => Some(v & !(PAGE_SIZE - 1)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fd_limits_consistent() {
        assert!(FIRST_ALLOCATABLE_FD < MAX_FDS);
        assert_eq!(STDIN_FD, 0);
        assert_eq!(STDERR_FD + 1, FIRST_ALLOCATABLE_FD);
    }

    #[test]
    fn test_console_handles_reserved() {
        assert!(CONSOLE_STDERR < FIRST_FILE_HANDLE);
    }

    #[test]
    fn test_page_align() {
        assert_eq!(page_align_up(0), Some(0));
        assert_eq!(page_align_up(1), Some(PAGE_SIZE));
        assert_eq!(page_align_up(PAGE_SIZE), Some(PAGE_SIZE));
        assert_eq!(page_align_up(PAGE_SIZE + 1), Some(2 * PAGE_SIZE));
    }

    #[test]
    fn test_page_align_top_of_address_space() {
        assert_eq!(page_align_up(u64::MAX - PAGE_SIZE + 1), Some(u64::MAX - PAGE_SIZE + 1));
        assert_eq!(page_align_up(u64::MAX - PAGE_SIZE + 2), None);
        assert_eq!(page_align_up(u64::MAX), None);
    }

    #[test]
    fn test_pid_base_above_reserved_range() {
        assert!(PID_BASE > 1);
    }
}
