/*!
 * User Memory Access
 *
 * All validation of pointer-shaped syscall arguments lives here. Handlers
 * receive raw words from the dispatcher and must go through these helpers
 * before treating any of them as memory.
 *
 * The persona hosts the foreign process inside its own address space, so a
 * non-null guest address is a live host pointer for the duration of the
 * syscall (the native scheduler guarantees at most one in-flight syscall per
 * process). That contract is what the SAFETY comments below rely on.
 */

use crate::core::limits::{MAX_ARG_STRINGS, MAX_USER_IO, PATH_MAX};
use crate::core::types::Address;
use thiserror::Error;

/// User memory access errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserMemError {
    #[error("null user pointer")]
    Null,

    #[error("user buffer length {0} exceeds limit")]
    TooLarge(u64),

    #[error("unterminated user string (no NUL within {0} bytes)")]
    Unterminated(usize),

    #[error("user string is not valid UTF-8")]
    BadEncoding,

    #[error("user pointer array exceeds {0} entries")]
    TooManyEntries(usize),
}

pub type UserResult<T> = Result<T, UserMemError>;

/// Copy `len` bytes out of user memory.
pub fn copy_from_user(addr: Address, len: u64) -> UserResult<Vec<u8>> {
    if addr == 0 {
        return Err(UserMemError::Null);
    }
    if len > MAX_USER_IO as u64 {
        return Err(UserMemError::TooLarge(len));
    }
    if len == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: addr is non-null and names `len` bytes of the hosted foreign
    // process's memory, which shares this address space and stays mapped for
    // the duration of the syscall.
    let slice = unsafe { std::slice::from_raw_parts(addr as *const u8, len as usize) };
    Ok(slice.to_vec())
}

/// Copy bytes back into a user buffer of at least `buf.len()` bytes.
pub fn copy_to_user(addr: Address, buf: &[u8]) -> UserResult<()> {
    if addr == 0 {
        return Err(UserMemError::Null);
    }
    if buf.len() > MAX_USER_IO {
        return Err(UserMemError::TooLarge(buf.len() as u64));
    }
    if buf.is_empty() {
        return Ok(());
    }
    // SAFETY: same hosting contract as copy_from_user; the destination is a
    // live writable buffer in the shared address space.
    unsafe {
        std::ptr::copy_nonoverlapping(buf.as_ptr(), addr as *mut u8, buf.len());
    }
    Ok(())
}

/// Read a NUL-terminated user string, bounded by PATH_MAX.
pub fn read_cstring(addr: Address) -> UserResult<String> {
    read_cstring_bounded(addr, PATH_MAX)
}

/// Read a NUL-terminated user string with an explicit byte bound.
pub fn read_cstring_bounded(addr: Address, max: usize) -> UserResult<String> {
    if addr == 0 {
        return Err(UserMemError::Null);
    }
    let mut bytes = Vec::new();
    for i in 0..max {
        // SAFETY: byte-at-a-time read inside the hosted process's memory;
        // never constructs a slice longer than the string actually is.
        let b = unsafe { (addr as *const u8).add(i).read() };
        if b == 0 {
            return String::from_utf8(bytes).map_err(|_| UserMemError::BadEncoding);
        }
        bytes.push(b);
    }
    Err(UserMemError::Unterminated(max))
}

/// Read a NULL-terminated array of user pointers (argv/envp shape).
pub fn read_ptr_array(addr: Address) -> UserResult<Vec<Address>> {
    if addr == 0 {
        return Err(UserMemError::Null);
    }
    let mut out = Vec::new();
    for i in 0..MAX_ARG_STRINGS {
        // SAFETY: word-at-a-time read inside the hosted process's memory.
        let p = unsafe { (addr as *const u64).add(i).read() };
        if p == 0 {
            return Ok(out);
        }
        out.push(p);
    }
    Err(UserMemError::TooManyEntries(MAX_ARG_STRINGS))
}

/// Read a NULL-terminated array of NUL-terminated strings (argv/envp).
pub fn read_string_array(addr: Address) -> UserResult<Vec<String>> {
    let ptrs = read_ptr_array(addr)?;
    ptrs.into_iter().map(read_cstring).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointer_rejected() {
        assert_eq!(copy_from_user(0, 16), Err(UserMemError::Null));
        assert_eq!(copy_to_user(0, b"x"), Err(UserMemError::Null));
        assert_eq!(read_cstring(0), Err(UserMemError::Null));
    }

    #[test]
    fn test_copy_round_trip() {
        let src = b"hello persona".to_vec();
        let got = copy_from_user(src.as_ptr() as Address, src.len() as u64).unwrap();
        assert_eq!(got, src);

        let mut dst = vec![0u8; src.len()];
        copy_to_user(dst.as_mut_ptr() as Address, &src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_zero_length_copy() {
        let src = b"x";
        let got = copy_from_user(src.as_ptr() as Address, 0).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let src = b"x";
        let err = copy_from_user(src.as_ptr() as Address, u64::MAX).unwrap_err();
        assert!(matches!(err, UserMemError::TooLarge(_)));
    }

    #[test]
    fn test_cstring_read() {
        let raw = b"/bin/true\0garbage";
        let s = read_cstring(raw.as_ptr() as Address).unwrap();
        assert_eq!(s, "/bin/true");
    }

    #[test]
    fn test_cstring_unterminated() {
        let raw = b"abc";
        let err = read_cstring_bounded(raw.as_ptr() as Address, 3).unwrap_err();
        assert_eq!(err, UserMemError::Unterminated(3));
    }

    #[test]
    fn test_string_array() {
        let a = b"arg0\0";
        let b = b"arg1\0";
        let ptrs: Vec<u64> = vec![a.as_ptr() as u64, b.as_ptr() as u64, 0];
        let strings = read_string_array(ptrs.as_ptr() as Address).unwrap();
        assert_eq!(strings, vec!["arg0".to_string(), "arg1".to_string()]);
    }
}
