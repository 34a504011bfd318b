/*!
 * Memory Syscalls
 * The address-space break (brk)
 */

use crate::core::limits::page_align_up;
use crate::core::types::Pid;
use crate::native::traits::MapAttrs;

use super::executor::Persona;
use super::types::{HandlerResult, SyscallArgs, SyscallError};

impl Persona {
    /// Query or move the break. `brk(0)` reads the current break without
    /// mutation; anything below the immutable start or past the top page of
    /// the address space is EINVAL and leaves the break untouched.
    /// Page-granular growth and shrink go through the VMM.
    pub(super) fn sys_brk(&mut self, pid: Pid, args: &SyscallArgs) -> HandlerResult {
        let requested = args.arg(0);

        let (start, current) = {
            let ctx = self.lifecycle.context(pid)?;
            (ctx.brk_start(), ctx.brk_current())
        };

        if requested == 0 {
            return Ok(current as i64);
        }
        if requested < start {
            return Err(SyscallError::invalid_argument(format!(
                "break {:#x} below start {:#x}",
                requested, start
            )));
        }

        let old_top = page_align_up(current).ok_or_else(|| {
            SyscallError::invalid_argument(format!("break {:#x} out of range", current))
        })?;
        let new_top = page_align_up(requested).ok_or_else(|| {
            SyscallError::invalid_argument(format!(
                "break {:#x} overflows the address space",
                requested
            ))
        })?;
        if new_top > old_top {
            self.vmm.map(old_top, new_top - old_top, MapAttrs::rw())?;
        } else if new_top < old_top {
            self.vmm.unmap(new_top, old_top - new_top)?;
        }

        self.lifecycle.context_mut(pid)?.set_brk(requested)?;
        Ok(requested as i64)
    }
}
