/*!
 * File Syscalls
 * read / write / open / close / getcwd / chdir
 */

use crate::abi::user;
use crate::core::limits::{FIRST_ALLOCATABLE_FD, FIRST_FILE_HANDLE, MAX_USER_IO};
use crate::core::types::{Fd, Pid};
use crate::native::traits::VfsError;
use crate::process::fd_table::{FdEntry, FdTableError};
use log::debug;

use super::executor::Persona;
use super::types::{HandlerResult, SyscallArgs, SyscallError};

impl Persona {
    fn fd_entry(&self, pid: Pid, fd: Fd) -> Result<FdEntry, SyscallError> {
        self.lifecycle
            .context(pid)?
            .fds
            .lookup(fd)
            .copied()
            .ok_or(SyscallError::BadDescriptor(fd as u64))
    }

    pub(super) fn sys_read(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let fd = args.arg(0) as Fd;
        let addr = args.arg(1);
        let len = args.arg(2);
        if addr == 0 {
            return Err(SyscallError::fault("read buffer is null"));
        }
        if len > MAX_USER_IO as u64 {
            return Err(SyscallError::fault(format!("read length {} too large", len)));
        }
        let entry = self.fd_entry(pid, fd)?;
        let handle = entry
            .backing
            .ok_or_else(|| SyscallError::not_implemented("descriptor has no backing handle"))?;

        let data = self.vfs.read(handle, len)?;
        user::copy_to_user(addr, &data)?;
        Ok(data.len() as i64)
    }

    pub(super) fn sys_write(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let fd = args.arg(0) as Fd;
        let addr = args.arg(1);
        let len = args.arg(2);
        if addr == 0 {
            return Err(SyscallError::fault("write buffer is null"));
        }
        let entry = self.fd_entry(pid, fd)?;
        let handle = entry
            .backing
            .ok_or_else(|| SyscallError::not_implemented("descriptor has no backing handle"))?;

        let bytes = user::copy_from_user(addr, len)?;
        let written = self.vfs.write(handle, &bytes)?;
        Ok(written as i64)
    }

    pub(super) fn sys_open(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let path = user::read_cstring(args.arg(0))?;
        let flags = args.arg(1) as u32;
        let mode = args.arg(2) as u32;
        let resolved = self.resolve_path(pid, &path)?;

        let handle = self.vfs.open_path(&resolved, flags, mode)?;
        let ctx = self.lifecycle.context_mut(pid)?;
        let fd = match ctx.fds.allocate() {
            Ok(fd) => fd,
            Err(FdTableError::Exhausted(capacity)) => {
                // Do not leak the native handle when the table is full
                let _ = self.vfs.close(handle);
                return Err(SyscallError::Exhausted(format!(
                    "descriptor table full ({} slots)",
                    capacity
                )));
            }
        };
        ctx.fds.set_backing(fd, handle, flags);
        debug!("pid {}: opened {} as fd {}", pid, resolved, fd);
        Ok(fd as i64)
    }

    /// Close a descriptor. Indices 0-2 are rejected outright: this persona
    /// forbids closing the standard streams, a deliberate divergence from
    /// POSIX that the tests pin down.
    pub(super) fn sys_close(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let fd = args.arg(0) as Fd;
        if fd < FIRST_ALLOCATABLE_FD {
            return Err(SyscallError::invalid_argument(format!(
                "closing standard descriptor {} is forbidden",
                fd
            )));
        }
        let ctx = self.lifecycle.context_mut(pid)?;
        let entry = ctx
            .fds
            .release(fd)
            .ok_or(SyscallError::BadDescriptor(fd as u64))?;
        if let Some(handle) = entry.backing {
            if handle >= FIRST_FILE_HANDLE {
                match self.vfs.close(handle) {
                    Ok(()) | Err(VfsError::BadHandle(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(0)
    }

    pub(super) fn sys_getcwd(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let addr = args.arg(0);
        let size = args.arg(1);
        let ctx = self.lifecycle.context(pid)?;
        let mut bytes = ctx.cwd().as_bytes().to_vec();
        bytes.push(0);
        if (size as usize) < bytes.len() {
            return Err(SyscallError::OutOfRange(format!(
                "cwd needs {} bytes, caller offered {}",
                bytes.len(),
                size
            )));
        }
        user::copy_to_user(addr, &bytes)?;
        Ok(bytes.len() as i64)
    }

    pub(super) fn sys_chdir(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let path = user::read_cstring(args.arg(0))?;
        let resolved = self.resolve_path(pid, &path)?;
        if !self.vfs.exists(&resolved) {
            return Err(SyscallError::NotFound(resolved));
        }
        self.lifecycle.context_mut(pid)?.set_cwd(&resolved)?;
        Ok(0)
    }

    /// Make a path absolute against the caller's working directory.
    fn resolve_path(&self, pid: Pid, path: &str) -> Result<String, SyscallError> {
        if path.is_empty() {
            return Err(SyscallError::invalid_argument("empty path"));
        }
        if path.starts_with('/') {
            return Ok(path.to_string());
        }
        let cwd = self.lifecycle.context(pid)?.cwd().trim_end_matches('/').to_string();
        Ok(format!("{}/{}", cwd, path))
    }
}
