/*!
 * Core Types
 * Common types used across the persona
 */

/// Emulated process ID type (foreign ABI register width)
pub type Pid = u64;

/// User ID type
pub type Uid = u64;

/// Group ID type
pub type Gid = u64;

/// File descriptor index type
pub type Fd = usize;

/// Guest virtual address type
pub type Address = u64;

/// Signal number type
pub type Signal = usize;

/// Opaque handle into the native VFS
pub type VfsHandle = u64;

/// Native-kernel process identifier
pub type NativePid = u64;
