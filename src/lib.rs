/*!
 * linux-persona
 *
 * A foreign-ABI compatibility persona: accepts syscalls issued with the
 * Linux x86-64 numbering and calling convention and executes them against a
 * different native kernel's primitives (VFS, VMM, scheduler). The foreign
 * per-process model (descriptor tables, credentials, break, signal slots)
 * is kept by the persona itself.
 */

pub mod abi;
pub mod core;
pub mod elf;
pub mod native;
pub mod process;
pub mod syscall;

// Re-exports
pub use crate::abi::{nr, Errno};
pub use crate::elf::{ImageDescriptor, LoaderError};
pub use crate::native::{
    FakeScheduler, FakeVmm, HostScheduler, HostVfs, HostVmm, MemVfs, NativeScheduler, Vfs, Vmm,
};
pub use crate::process::{
    ContextRegistry, Credentials, FdTable, LifecycleManager, ProcessContext, ProcessError,
    ProcessState, SignalDisposition,
};
pub use crate::syscall::{DispatchStats, Persona, PersonaBuilder, SyscallArgs, SyscallError};
