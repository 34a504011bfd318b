/*!
 * Native Kernel Collaborators
 * Capability traits plus host-backed and in-memory implementations
 */

pub mod fake;
pub mod host;
pub mod traits;

pub use fake::{FakeScheduler, FakeVmm, MemVfs};
pub use host::{HostScheduler, HostVfs, HostVmm};
pub use traits::{
    MapAttrs, NativeScheduler, SchedError, SchedResult, Vfs, VfsError, VfsResult, Vmm, VmmError,
    VmmResult,
};
