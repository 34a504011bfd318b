/*!
 * Foreign Errno Values
 * Linux x86-64 errno numbers, bit-exact so unmodified foreign libc code
 * interprets results correctly
 */

use serde::{Deserialize, Serialize};

/// Errno values the persona can surface to a foreign process.
///
/// The numeric values must match the emulated ABI exactly; a handler failure
/// reaches the foreign process as `-(errno as i64)` in the return register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i64)]
pub enum Errno {
    /// Operation not permitted
    Eperm = 1,
    /// No such file or directory
    Enoent = 2,
    /// I/O error
    Eio = 5,
    /// Exec format error
    Enoexec = 8,
    /// Bad file descriptor
    Ebadf = 9,
    /// Out of memory
    Enomem = 12,
    /// Bad address
    Efault = 14,
    /// Invalid argument
    Einval = 22,
    /// Too many open files
    Emfile = 24,
    /// Result too large for the provided buffer
    Erange = 34,
    /// File name too long
    Enametoolong = 36,
    /// Function not implemented
    Enosys = 38,
}

impl Errno {
    /// Encode as the foreign ABI's negative return value
    #[inline]
    #[must_use]
    pub const fn as_ret(self) -> i64 {
        -(self as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values_match_linux() {
        assert_eq!(Errno::Ebadf as i64, 9);
        assert_eq!(Errno::Efault as i64, 14);
        assert_eq!(Errno::Einval as i64, 22);
        assert_eq!(Errno::Emfile as i64, 24);
        assert_eq!(Errno::Enosys as i64, 38);
        assert_eq!(Errno::Enoexec as i64, 8);
    }

    #[test]
    fn test_negative_encoding() {
        assert_eq!(Errno::Enosys.as_ret(), -38);
        assert!(Errno::Eperm.as_ret() < 0);
    }
}
