/*!
 * Persona Executor
 *
 * The foreign-ABI entry point: owns the lifecycle manager and the syscall
 * table, and encodes every handler outcome into the foreign calling
 * convention's signed return value. A misbehaving foreign process can only
 * ever earn itself a negative errno; it can never bring the persona down.
 */

use crate::core::types::Pid;
use crate::elf::ImageDescriptor;
use crate::native::fake::{FakeScheduler, FakeVmm, MemVfs};
use crate::native::traits::{NativeScheduler, Vfs, Vmm};
use crate::process::context::ProcessContext;
use crate::process::lifecycle::LifecycleManager;
use crate::process::types::{Credentials, ProcessResult};
use crate::abi::Errno;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::table::SyscallTable;
use super::types::SyscallArgs;

/// Dispatch outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatchStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub not_implemented: u64,
}

/// The compatibility persona: accepts syscalls in the foreign numbering and
/// calling convention and executes them against native-kernel collaborators.
pub struct Persona {
    pub(super) lifecycle: LifecycleManager,
    pub(super) vfs: Arc<dyn Vfs>,
    pub(super) vmm: Arc<dyn Vmm>,
    pub(super) sched: Arc<dyn NativeScheduler>,
    table: SyscallTable,
    stats: DispatchStats,
}

impl Persona {
    #[must_use]
    pub fn builder() -> PersonaBuilder {
        PersonaBuilder::default()
    }

    /// Create a context for a new foreign process (Created state).
    pub fn create_process(&mut self, creds: Credentials) -> ProcessResult<Pid> {
        self.lifecycle.create_process(0, creds)
    }

    /// Create a context, load its initial image, and mark it runnable.
    pub fn spawn(
        &mut self,
        path: &str,
        env: Vec<String>,
        creds: Credentials,
    ) -> ProcessResult<(Pid, ImageDescriptor)> {
        let pid = self.lifecycle.create_process(0, creds)?;
        let descriptor = self.lifecycle.load_initial_image(pid, path, env)?;
        self.lifecycle.start(pid)?;
        Ok((pid, descriptor))
    }

    /// Mark a created process as running.
    pub fn start_process(&mut self, pid: Pid) -> ProcessResult<()> {
        self.lifecycle.start(pid)
    }

    /// Destroy a context outside the exit path (native-side teardown).
    pub fn destroy_process(&mut self, pid: Pid) -> ProcessResult<()> {
        self.lifecycle.destroy(pid)
    }

    /// Inspect a live context.
    #[must_use]
    pub fn context(&self, pid: Pid) -> Option<&ProcessContext> {
        self.lifecycle.registry().get(pid)
    }

    /// Live process count.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.lifecycle.registry().len()
    }

    #[inline]
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Dispatch one foreign syscall.
    ///
    /// Return convention, bit-exact with the emulated ABI: a non-negative
    /// value is the success payload (byte count, fd, pid, address); a
    /// negative value is the negated errno. Nothing a foreign process passes
    /// in can make this panic.
    pub fn dispatch(&mut self, pid: Pid, number: u64, args: impl Into<SyscallArgs>) -> i64 {
        let args = args.into();
        self.stats.total += 1;

        if !self.lifecycle.registry().contains(pid) {
            warn!("dispatch for unknown pid {} (nr {})", pid, number);
            self.stats.failed += 1;
            return Errno::Einval.as_ret();
        }

        let Some((name, handler)) = self.table.lookup(number) else {
            debug!("pid {}: syscall {} outside known set -> ENOSYS", pid, number);
            self.stats.not_implemented += 1;
            return Errno::Enosys.as_ret();
        };

        trace!("pid {}: {}({:#x?})", pid, name, args.0);
        match handler(self, pid, &args) {
            Ok(value) => {
                self.stats.succeeded += 1;
                trace!("pid {}: {} -> {}", pid, name, value);
                value
            }
            Err(e) if e.is_expected_gap() => {
                // Bring-up gap, not a fault; keep it out of the error logs
                self.stats.not_implemented += 1;
                debug!("pid {}: {} not implemented: {}", pid, name, e);
                e.errno().as_ret()
            }
            Err(e) => {
                self.stats.failed += 1;
                debug!("pid {}: {} failed: {}", pid, name, e);
                e.errno().as_ret()
            }
        }
    }
}

/// Builder wiring the persona to its native collaborators. Seams left
/// unset fall back to the in-memory fakes, which is the isolated-test
/// configuration.
#[derive(Default)]
pub struct PersonaBuilder {
    vfs: Option<Arc<dyn Vfs>>,
    vmm: Option<Arc<dyn Vmm>>,
    sched: Option<Arc<dyn NativeScheduler>>,
}

impl PersonaBuilder {
    #[inline]
    #[must_use]
    pub fn with_vfs(mut self, vfs: Arc<dyn Vfs>) -> Self {
        self.vfs = Some(vfs);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_vmm(mut self, vmm: Arc<dyn Vmm>) -> Self {
        self.vmm = Some(vmm);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scheduler(mut self, sched: Arc<dyn NativeScheduler>) -> Self {
        self.sched = Some(sched);
        self
    }

    #[must_use]
    pub fn build(self) -> Persona {
        let vfs = self.vfs.unwrap_or_else(|| Arc::new(MemVfs::new()));
        let vmm = self.vmm.unwrap_or_else(|| Arc::new(FakeVmm::new()));
        let sched = self.sched.unwrap_or_else(|| Arc::new(FakeScheduler::new()));
        let table = SyscallTable::with_defaults();
        info!(
            "persona ready: {} syscalls, vfs {}",
            table.len(),
            vfs.name()
        );
        Persona {
            lifecycle: LifecycleManager::new(vfs.clone(), vmm.clone(), sched.clone()),
            vfs,
            vmm,
            sched,
            table,
            stats: DispatchStats::default(),
        }
    }
}
