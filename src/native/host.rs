/*!
 * Host-Backed Collaborators
 *
 * Collaborator implementations wired to the hosting OS: real files for the
 * VFS, process stdio for the console handles, and bookkeeping stand-ins for
 * the VMM and scheduler seams (address-space mapping is recorded and
 * validated; nothing is reserved from the host).
 */

use crate::core::limits::{CONSOLE_STDERR, CONSOLE_STDIN, CONSOLE_STDOUT, FIRST_FILE_HANDLE};
use crate::core::types::{Address, NativePid, VfsHandle};
use crate::native::traits::{
    MapAttrs, NativeScheduler, SchedError, SchedResult, Vfs, VfsError, VfsResult, Vmm, VmmError,
    VmmResult,
};
use ahash::AHashMap;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

// Foreign open(2) flag bits
const O_ACCMODE: u32 = 0x3;
const O_WRONLY: u32 = 0x1;
const O_RDWR: u32 = 0x2;
const O_CREAT: u32 = 0x40;
const O_TRUNC: u32 = 0x200;
const O_APPEND: u32 = 0x400;

/// VFS backed by the host filesystem.
pub struct HostVfs {
    handles: Mutex<AHashMap<VfsHandle, File>>,
    next_handle: AtomicU64,
}

impl HostVfs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(AHashMap::new()),
            next_handle: AtomicU64::new(FIRST_FILE_HANDLE),
        }
    }
}

impl Default for HostVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs for HostVfs {
    fn open_path(&self, path: &str, flags: u32, _mode: u32) -> VfsResult<VfsHandle> {
        let mut options = OpenOptions::new();
        match flags & O_ACCMODE {
            O_WRONLY => {
                options.write(true);
            }
            O_RDWR => {
                options.read(true).write(true);
            }
            _ => {
                options.read(true);
            }
        }
        if flags & O_CREAT != 0 {
            options.create(true).write(true);
        }
        if flags & O_TRUNC != 0 {
            options.truncate(true);
        }
        if flags & O_APPEND != 0 {
            options.append(true);
        }

        let file = options.open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(path.to_string()),
            _ => VfsError::Io(e.to_string()),
        })?;

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(handle, file);
        debug!("hostvfs: opened {} as handle {}", path, handle);
        Ok(handle)
    }

    fn read(&self, handle: VfsHandle, len: u64) -> VfsResult<Vec<u8>> {
        if handle == CONSOLE_STDIN {
            let mut buf = vec![0u8; len as usize];
            let n = std::io::stdin()
                .read(&mut buf)
                .map_err(|e| VfsError::Io(e.to_string()))?;
            buf.truncate(n);
            return Ok(buf);
        }
        if handle == CONSOLE_STDOUT || handle == CONSOLE_STDERR {
            return Err(VfsError::NotSupported("read from output console".into()));
        }
        let mut handles = self.handles.lock();
        let file = handles.get_mut(&handle).ok_or(VfsError::BadHandle(handle))?;
        let mut buf = vec![0u8; len as usize];
        let n = file.read(&mut buf).map_err(|e| VfsError::Io(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn write(&self, handle: VfsHandle, data: &[u8]) -> VfsResult<u64> {
        match handle {
            CONSOLE_STDOUT => {
                std::io::stdout()
                    .write_all(data)
                    .map_err(|e| VfsError::Io(e.to_string()))?;
                Ok(data.len() as u64)
            }
            CONSOLE_STDERR => {
                std::io::stderr()
                    .write_all(data)
                    .map_err(|e| VfsError::Io(e.to_string()))?;
                Ok(data.len() as u64)
            }
            CONSOLE_STDIN => Err(VfsError::NotSupported("write to stdin console".into())),
            _ => {
                let mut handles = self.handles.lock();
                let file = handles.get_mut(&handle).ok_or(VfsError::BadHandle(handle))?;
                file.write_all(data).map_err(|e| VfsError::Io(e.to_string()))?;
                Ok(data.len() as u64)
            }
        }
    }

    fn close(&self, handle: VfsHandle) -> VfsResult<()> {
        if handle < FIRST_FILE_HANDLE {
            return Ok(());
        }
        self.handles
            .lock()
            .remove(&handle)
            .map(|_| ())
            .ok_or(VfsError::BadHandle(handle))
    }

    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(path.to_string()),
            _ => VfsError::Io(e.to_string()),
        })
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn name(&self) -> &'static str {
        "hostvfs"
    }
}

/// Bookkeeping VMM: validates and records mappings without touching host
/// address space. The native kernel substitutes its real manager here.
pub struct HostVmm {
    mapped: Mutex<Vec<(Address, u64)>>,
}

impl HostVmm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mapped: Mutex::new(Vec::new()),
        }
    }
}

impl Default for HostVmm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vmm for HostVmm {
    fn map(&self, base: Address, size: u64, attrs: MapAttrs) -> VmmResult<()> {
        if size == 0 || base.checked_add(size).is_none() {
            return Err(VmmError::BadRange { base, size });
        }
        debug!(
            "vmm: map {:#x}..{:#x} r={} w={} x={}",
            base,
            base + size,
            attrs.read,
            attrs.write,
            attrs.execute
        );
        self.mapped.lock().push((base, size));
        Ok(())
    }

    fn unmap(&self, base: Address, size: u64) -> VmmResult<()> {
        if size == 0 || base.checked_add(size).is_none() {
            return Err(VmmError::BadRange { base, size });
        }
        debug!("vmm: unmap {:#x}..{:#x}", base, base + size);
        self.mapped
            .lock()
            .retain(|&(b, s)| b + s <= base || b >= base + size);
        Ok(())
    }
}

/// Bookkeeping scheduler: allocates native pids and logs lifecycle events.
/// The native kernel substitutes its real scheduler here.
pub struct HostScheduler {
    next_native: AtomicU64,
}

impl HostScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_native: AtomicU64::new(1),
        }
    }
}

impl Default for HostScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeScheduler for HostScheduler {
    fn create_process(&self) -> SchedResult<NativePid> {
        let native = self.next_native.fetch_add(1, Ordering::Relaxed);
        info!("scheduler: created native process {}", native);
        Ok(native)
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn terminate(&self, native: NativePid, status: i64) -> SchedResult<()> {
        if native == 0 || native >= self.next_native.load(Ordering::Relaxed) {
            return Err(SchedError::UnknownProcess(native));
        }
        info!("scheduler: terminated native {} (status {})", native, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_vmm_rejects_degenerate_ranges() {
        let vmm = HostVmm::new();
        assert!(vmm.map(0x1000, 0, MapAttrs::rw()).is_err());
        assert!(vmm.map(u64::MAX, 0x1000, MapAttrs::rw()).is_err());
        assert!(vmm.map(0x1000, 0x1000, MapAttrs::rw()).is_ok());
    }

    #[test]
    fn test_host_scheduler_pids() {
        let sched = HostScheduler::new();
        let a = sched.create_process().unwrap();
        let b = sched.create_process().unwrap();
        assert_eq!(b, a + 1);
        assert!(sched.terminate(a, 0).is_ok());
        assert!(sched.terminate(b + 7, 0).is_err());
    }
}
