/*!
 * Process Lifecycle Manager
 *
 * Orchestrates creation, image replacement, and termination of emulated
 * processes, coordinating the context registry, the ELF loader, and the
 * native kernel's primitives. State machine per process:
 * Created -> Running -> (Exited | Replaced), with Replaced re-entering
 * Running once the new image is mapped.
 */

use crate::core::limits::page_align_up;
use crate::core::types::{Address, Pid};
use crate::elf::{self, ImageDescriptor, LoaderError};
use crate::native::traits::{MapAttrs, NativeScheduler, Vfs, VfsError, Vmm};
use crate::process::context::ProcessContext;
use crate::process::registry::ContextRegistry;
use crate::process::types::{Credentials, ProcessError, ProcessResult, ProcessState};
use log::{info, warn};
use std::sync::Arc;

/// Owns every live context and drives their state machines.
pub struct LifecycleManager {
    registry: ContextRegistry,
    vfs: Arc<dyn Vfs>,
    vmm: Arc<dyn Vmm>,
    sched: Arc<dyn NativeScheduler>,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(vfs: Arc<dyn Vfs>, vmm: Arc<dyn Vmm>, sched: Arc<dyn NativeScheduler>) -> Self {
        info!("lifecycle manager initialized (vfs: {})", vfs.name());
        Self {
            registry: ContextRegistry::new(),
            vfs,
            vmm,
            sched,
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Borrow a context for the duration of one syscall.
    pub fn context(&self, pid: Pid) -> ProcessResult<&ProcessContext> {
        self.registry
            .get(pid)
            .ok_or(ProcessError::ProcessNotFound(pid))
    }

    pub fn context_mut(&mut self, pid: Pid) -> ProcessResult<&mut ProcessContext> {
        self.registry
            .get_mut(pid)
            .ok_or(ProcessError::ProcessNotFound(pid))
    }

    /// Create a context in the Created state backed by a fresh native
    /// process shell.
    pub fn create_process(&mut self, ppid: Pid, creds: Credentials) -> ProcessResult<Pid> {
        let native = self
            .sched
            .create_process()
            .map_err(|e| ProcessError::NativeFailure(e.to_string()))?;
        Ok(self.registry.create(ppid, native, creds))
    }

    /// Mark the first instruction as executing: Created -> Running.
    pub fn start(&mut self, pid: Pid) -> ProcessResult<()> {
        self.context_mut(pid)?.transition(ProcessState::Running)
    }

    /// Load an image into a context that has not yet run (initial exec).
    /// The context stays in Created; `start` makes it runnable.
    pub fn load_initial_image(
        &mut self,
        pid: Pid,
        path: &str,
        env: Vec<String>,
    ) -> ProcessResult<ImageDescriptor> {
        let (descriptor, mapped_size, heap_base) = self.prepare_image(path)?;
        self.map_image(&descriptor, mapped_size)?;
        let ctx = self.context_mut(pid)?;
        ctx.set_env(env);
        ctx.set_image(descriptor.base_address, mapped_size);
        ctx.rebase_brk(heap_base);
        info!(
            "pid {}: loaded initial image {} (entry {:#x})",
            pid, path, descriptor.entry_point
        );
        Ok(descriptor)
    }

    /// Replace a running process's image: Running -> Replaced -> Running.
    ///
    /// On success the old image's state is logically discarded; the pid and
    /// the descriptor table survive, the environment is replaced, signal
    /// dispositions fall back to their defaults, and the break is rebased to
    /// the end of the new load range. The foreign process never observes a
    /// return value: control resumes at the new entry point.
    pub fn exec(
        &mut self,
        pid: Pid,
        path: &str,
        argv: Vec<String>,
        env: Vec<String>,
    ) -> ProcessResult<ImageDescriptor> {
        // Validate the caller, its state, and the new image before any side
        // effect; a failed exec leaves the old image running untouched.
        if self.context(pid)?.state() != ProcessState::Running {
            return Err(ProcessError::InvalidStateTransition {
                from: self.context(pid)?.state(),
                to: ProcessState::Replaced,
            });
        }
        let (descriptor, mapped_size, heap_base) = self.prepare_image(path)?;

        // The old image is dead from here on. Release its ranges before the
        // replacement maps, so re-execing the same image does not unmap the
        // mapping it just made.
        let (old_image, heap_start, heap_current) = {
            let ctx = self.context(pid)?;
            (ctx.image_range(), ctx.brk_start(), ctx.brk_current())
        };
        if let Some((base, len)) = old_image {
            if let Err(e) = self.vmm.unmap(base, len) {
                warn!("pid {}: unmapping replaced image failed: {}", pid, e);
            }
        }
        if let Some(heap_top) = page_align_up(heap_current) {
            if heap_top > heap_start {
                if let Err(e) = self.vmm.unmap(heap_start, heap_top - heap_start) {
                    warn!("pid {}: unmapping replaced heap failed: {}", pid, e);
                }
            }
        }
        self.map_image(&descriptor, mapped_size)?;

        let ctx = self.context_mut(pid)?;
        ctx.transition(ProcessState::Replaced)?;
        ctx.set_env(env);
        ctx.reset_signals();
        ctx.set_image(descriptor.base_address, mapped_size);
        ctx.rebase_brk(heap_base);
        ctx.transition(ProcessState::Running)?;
        info!(
            "pid {}: replaced image with {} (argv {:?}, entry {:#x})",
            pid, path, argv, descriptor.entry_point
        );
        Ok(descriptor)
    }

    /// Duplicate the calling process.
    ///
    /// Required contract, not yet delivered: duplicate the context under a
    /// fresh pid with `ppid` set to the caller's pid, copy the descriptor
    /// table with shared backing handles per POSIX fork semantics, copy the
    /// environment and signal dispositions, and clone the address space
    /// through the VMM. Until that lands this returns NotImplemented; the
    /// gap is deliberate and visible, never approximated.
    pub fn fork(&mut self, pid: Pid) -> ProcessResult<Pid> {
        self.context(pid)?;
        warn!("pid {}: fork requested but not yet implemented", pid);
        Err(ProcessError::NotImplemented("fork"))
    }

    /// Terminate a process and destroy its context.
    pub fn exit(&mut self, pid: Pid, status: i64) -> ProcessResult<()> {
        {
            let ctx = self.context_mut(pid)?;
            ctx.transition(ProcessState::Exited)?;
        }
        let ctx = self.context(pid)?;
        let native = ctx.native_pid();
        if let Err(e) = self.sched.terminate(native, status) {
            warn!("pid {}: native terminate failed: {}", pid, e);
        }
        self.destroy(pid)?;
        info!("pid {} exited with status {}", pid, status);
        Ok(())
    }

    /// Release every descriptor, free the environment, and discard the
    /// record. Exactly-once: a second call reports ProcessNotFound.
    pub fn destroy(&mut self, pid: Pid) -> ProcessResult<()> {
        let mut ctx = self
            .registry
            .remove(pid)
            .ok_or(ProcessError::ProcessNotFound(pid))?;
        for (fd, entry) in ctx.fds.drain() {
            if let Some(handle) = entry.backing {
                match self.vfs.close(handle) {
                    Ok(()) | Err(VfsError::BadHandle(_)) => {}
                    Err(e) => warn!("pid {}: closing fd {} failed: {}", pid, fd, e),
                }
            }
        }
        // Environment and signal slots go down with the context itself
        Ok(())
    }

    /// Read and parse an image without side effects, returning its load plan,
    /// the page-aligned mapping size, and the heap base that follows the load
    /// range. An envelope that does not fit the address space is malformed.
    fn prepare_image(&self, path: &str) -> ProcessResult<(ImageDescriptor, u64, Address)> {
        let bytes = self.vfs.read_file(path).map_err(|e| match e {
            VfsError::NotFound(p) => ProcessError::ImageNotFound(p),
            other => ProcessError::NativeFailure(other.to_string()),
        })?;
        let descriptor = elf::parse(&bytes)?;

        let mapped_size = page_align_up(descriptor.load_size.max(1))
            .ok_or(ProcessError::ImageMalformed(LoaderError::AddressOverflow))?;
        let heap_base = page_align_up(descriptor.load_end())
            .ok_or(ProcessError::ImageMalformed(LoaderError::AddressOverflow))?;
        Ok((descriptor, mapped_size, heap_base))
    }

    fn map_image(&self, descriptor: &ImageDescriptor, mapped_size: u64) -> ProcessResult<()> {
        self.vmm
            .map(descriptor.base_address, mapped_size, MapAttrs::rwx())
            .map_err(|e| ProcessError::NativeFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::fake::{FakeScheduler, FakeVmm, MemVfs};

    fn manager_with(vfs: MemVfs) -> (LifecycleManager, Arc<FakeVmm>, Arc<FakeScheduler>) {
        let vmm = Arc::new(FakeVmm::new());
        let sched = Arc::new(FakeScheduler::new());
        let manager = LifecycleManager::new(Arc::new(vfs), vmm.clone(), sched.clone());
        (manager, vmm, sched)
    }

    #[test]
    fn test_create_start_exit() {
        let (mut manager, _, sched) = manager_with(MemVfs::new());
        let pid = manager.create_process(0, Credentials::root()).unwrap();
        manager.start(pid).unwrap();
        manager.exit(pid, 7).unwrap();

        assert!(manager.context(pid).is_err());
        assert_eq!(sched.terminated().len(), 1);
        assert_eq!(sched.terminated()[0].1, 7);
    }

    #[test]
    fn test_destroy_twice_is_an_error() {
        let (mut manager, _, _) = manager_with(MemVfs::new());
        let pid = manager.create_process(0, Credentials::root()).unwrap();
        manager.destroy(pid).unwrap();
        assert!(matches!(
            manager.destroy(pid),
            Err(ProcessError::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_exec_requires_running() {
        let (mut manager, _, _) = manager_with(MemVfs::new());
        let pid = manager.create_process(0, Credentials::root()).unwrap();
        let err = manager.exec(pid, "/bin/app", vec![], vec![]).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_exec_missing_image() {
        let (mut manager, _, _) = manager_with(MemVfs::new());
        let pid = manager.create_process(0, Credentials::root()).unwrap();
        manager.start(pid).unwrap();
        assert!(matches!(
            manager.exec(pid, "/bin/ghost", vec![], vec![]),
            Err(ProcessError::ImageNotFound(_))
        ));
        // Failed exec leaves the process running
        assert_eq!(manager.context(pid).unwrap().state(), ProcessState::Running);
    }

    #[test]
    fn test_fork_is_an_explicit_gap() {
        let (mut manager, _, _) = manager_with(MemVfs::new());
        let pid = manager.create_process(0, Credentials::root()).unwrap();
        assert!(matches!(
            manager.fork(pid),
            Err(ProcessError::NotImplemented("fork"))
        ));
    }
}
