/*!
 * Process Syscalls
 * Identity reads, yield, signal recording, and the lifecycle trio
 * (fork / execve / exit)
 */

use crate::abi::user;
use crate::core::types::Pid;
use crate::process::types::SignalDisposition;
use log::debug;

use super::executor::Persona;
use super::types::{HandlerResult, SyscallArgs, SyscallError};

// sa_handler sentinels from the foreign ABI
const SIG_DFL: u64 = 0;
const SIG_IGN: u64 = 1;

impl Persona {
    pub(super) fn sys_getpid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.pid() as i64)
    }

    pub(super) fn sys_getppid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.ppid() as i64)
    }

    pub(super) fn sys_getuid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.creds().uid as i64)
    }

    pub(super) fn sys_getgid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.creds().gid as i64)
    }

    pub(super) fn sys_geteuid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.creds().euid as i64)
    }

    pub(super) fn sys_getegid(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        Ok(self.lifecycle.context(pid)?.creds().egid as i64)
    }

    pub(super) fn sys_sched_yield(&mut self, _pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        self.sched.yield_now();
        Ok(0)
    }

    pub(super) fn sys_fork(&mut self, pid: Pid, _args: &SyscallArgs) -> HandlerResult {
        let child = self.lifecycle.fork(pid)?;
        Ok(child as i64)
    }

    pub(super) fn sys_execve(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let path = user::read_cstring(args.arg(0))?;
        let argv = match args.arg(1) {
            0 => Vec::new(),
            addr => user::read_string_array(addr)?,
        };
        let env = match args.arg(2) {
            0 => Vec::new(),
            addr => user::read_string_array(addr)?,
        };
        self.lifecycle.exec(pid, &path, argv, env)?;
        // Success never returns to the old image; control resumes at the new
        // entry point and this value is dead.
        Ok(0)
    }

    pub(super) fn sys_exit(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let status = args.arg(0) as i64;
        debug!("pid {}: exit({})", pid, status);
        self.lifecycle.exit(pid, status)?;
        // The native scheduler has already torn the thread down; the caller
        // never observes this value.
        Ok(0)
    }

    /// Record a signal disposition. Recording only: delivery is out of scope
    /// for this layer.
    pub(super) fn sys_rt_sigaction(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let sig = args.arg(0) as usize;
        let act = args.arg(1);
        let oldact = args.arg(2);

        let new_disposition = if act != 0 {
            let raw = user::copy_from_user(act, 8)?;
            let handler = u64::from_le_bytes([
                raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
            ]);
            Some(match handler {
                SIG_DFL => SignalDisposition::Default,
                SIG_IGN => SignalDisposition::Ignore,
                addr => SignalDisposition::Handler(addr),
            })
        } else {
            None
        };

        let ctx = self.lifecycle.context_mut(pid)?;
        let previous = match new_disposition {
            Some(disposition) => ctx.set_signal_disposition(sig, disposition),
            None => ctx.signal_disposition(sig),
        }
        .ok_or_else(|| SyscallError::invalid_argument(format!("bad signal number {}", sig)))?;

        if oldact != 0 {
            let raw = match previous {
                SignalDisposition::Default => SIG_DFL,
                SignalDisposition::Ignore => SIG_IGN,
                SignalDisposition::Handler(addr) => addr,
            };
            user::copy_to_user(oldact, &raw.to_le_bytes())?;
        }
        Ok(0)
    }
}
