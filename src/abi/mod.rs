/*!
 * Foreign ABI
 * Errno values, syscall numbers, and user-memory access for the emulated
 * Linux x86-64 calling convention
 */

pub mod errno;
pub mod nr;
pub mod user;

pub use errno::Errno;
pub use user::{UserMemError, UserResult};
