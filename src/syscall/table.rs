/*!
 * Syscall Lookup Table
 *
 * Total mapping from foreign syscall number to handler. An unknown number
 * is a lookup miss, which the dispatcher turns into ENOSYS; there is no
 * trailing default branch to forget.
 */

use crate::abi::nr;
use crate::core::types::Pid;
use ahash::AHashMap;

use super::executor::Persona;
use super::types::{HandlerResult, SyscallArgs};

/// Handler function pointer. Handlers receive only primitive words; any
/// pointer-shaped argument is validated inside the handler via `abi::user`.
pub type SyscallFn = fn(&mut Persona, Pid, &SyscallArgs) -> HandlerResult;

/// Number-keyed handler table.
pub struct SyscallTable {
    handlers: AHashMap<u64, (&'static str, SyscallFn)>,
}

impl SyscallTable {
    /// Build the table for the implemented subset of the foreign ABI.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self {
            handlers: AHashMap::new(),
        };
        table.register(nr::SYS_READ, "read", Persona::sys_read);
        table.register(nr::SYS_WRITE, "write", Persona::sys_write);
        table.register(nr::SYS_OPEN, "open", Persona::sys_open);
        table.register(nr::SYS_CLOSE, "close", Persona::sys_close);
        table.register(nr::SYS_BRK, "brk", Persona::sys_brk);
        table.register(nr::SYS_RT_SIGACTION, "rt_sigaction", Persona::sys_rt_sigaction);
        table.register(nr::SYS_SCHED_YIELD, "sched_yield", Persona::sys_sched_yield);
        table.register(nr::SYS_GETPID, "getpid", Persona::sys_getpid);
        table.register(nr::SYS_FORK, "fork", Persona::sys_fork);
        table.register(nr::SYS_EXECVE, "execve", Persona::sys_execve);
        table.register(nr::SYS_EXIT, "exit", Persona::sys_exit);
        table.register(nr::SYS_GETCWD, "getcwd", Persona::sys_getcwd);
        table.register(nr::SYS_CHDIR, "chdir", Persona::sys_chdir);
        table.register(nr::SYS_GETUID, "getuid", Persona::sys_getuid);
        table.register(nr::SYS_GETGID, "getgid", Persona::sys_getgid);
        table.register(nr::SYS_GETEUID, "geteuid", Persona::sys_geteuid);
        table.register(nr::SYS_GETEGID, "getegid", Persona::sys_getegid);
        table.register(nr::SYS_GETPPID, "getppid", Persona::sys_getppid);
        table
    }

    fn register(&mut self, number: u64, name: &'static str, handler: SyscallFn) {
        debug_assert!(
            !self.handlers.contains_key(&number),
            "duplicate syscall number {}",
            number
        );
        self.handlers.insert(number, (name, handler));
    }

    /// Look up a handler; miss means the number is outside the known set.
    #[inline]
    #[must_use]
    pub fn lookup(&self, number: u64) -> Option<(&'static str, SyscallFn)> {
        self.handlers.get(&number).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_numbers_present() {
        let table = SyscallTable::with_defaults();
        for number in [
            nr::SYS_READ,
            nr::SYS_WRITE,
            nr::SYS_OPEN,
            nr::SYS_CLOSE,
            nr::SYS_BRK,
            nr::SYS_SCHED_YIELD,
            nr::SYS_GETPID,
            nr::SYS_FORK,
            nr::SYS_EXECVE,
            nr::SYS_EXIT,
            nr::SYS_GETUID,
            nr::SYS_GETGID,
            nr::SYS_GETEUID,
            nr::SYS_GETEGID,
        ] {
            assert!(table.lookup(number).is_some(), "missing {}", number);
        }
    }

    #[test]
    fn test_unknown_number_misses() {
        let table = SyscallTable::with_defaults();
        assert!(table.lookup(9999).is_none());
        assert!(table.lookup(2).is_some());
        assert_eq!(table.lookup(1).unwrap().0, "write");
    }
}
