/*!
 * In-Memory Fakes
 *
 * Collaborator implementations with no host dependencies, used to test the
 * persona in isolation. The fake VFS captures console output and serves
 * seeded stdin so end-to-end dispatch tests can assert on bytes.
 */

use crate::core::limits::{CONSOLE_STDERR, CONSOLE_STDIN, CONSOLE_STDOUT, FIRST_FILE_HANDLE};
use crate::core::types::{Address, NativePid, VfsHandle};
use crate::native::traits::{
    MapAttrs, NativeScheduler, SchedError, SchedResult, Vfs, VfsError, VfsResult, Vmm, VmmError,
    VmmResult,
};
use ahash::AHashMap;
use log::trace;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct OpenFile {
    path: String,
    pos: usize,
}

#[derive(Default)]
struct MemVfsState {
    files: AHashMap<String, Vec<u8>>,
    handles: AHashMap<VfsHandle, OpenFile>,
    stdin: Vec<u8>,
    stdin_pos: usize,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// In-memory VFS fake.
pub struct MemVfs {
    state: Mutex<MemVfsState>,
    next_handle: AtomicU64,
}

impl MemVfs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemVfsState::default()),
            next_handle: AtomicU64::new(FIRST_FILE_HANDLE),
        }
    }

    /// Seed a file.
    #[must_use]
    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        self.state.lock().files.insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Seed bytes to be served by reads on stdin.
    pub fn seed_stdin(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.stdin.extend_from_slice(bytes);
    }

    /// Bytes written to the console so far.
    #[must_use]
    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.state.lock().stdout.clone()
    }

    #[must_use]
    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.state.lock().stderr.clone()
    }

    /// Number of live (non-console) handles.
    #[must_use]
    pub fn open_handle_count(&self) -> usize {
        self.state.lock().handles.len()
    }
}

impl Default for MemVfs {
    fn default() -> Self {
        Self::new()
    }
}

// O_CREAT, as the foreign ABI encodes it
const O_CREAT: u32 = 0x40;

impl Vfs for MemVfs {
    fn open_path(&self, path: &str, flags: u32, _mode: u32) -> VfsResult<VfsHandle> {
        let mut state = self.state.lock();
        if !state.files.contains_key(path) {
            if flags & O_CREAT == 0 {
                return Err(VfsError::NotFound(path.to_string()));
            }
            state.files.insert(path.to_string(), Vec::new());
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        state.handles.insert(
            handle,
            OpenFile {
                path: path.to_string(),
                pos: 0,
            },
        );
        trace!("memvfs: opened {} as handle {}", path, handle);
        Ok(handle)
    }

    fn read(&self, handle: VfsHandle, len: u64) -> VfsResult<Vec<u8>> {
        let mut state = self.state.lock();
        match handle {
            CONSOLE_STDIN => {
                let pos = state.stdin_pos;
                let take = (state.stdin.len() - pos).min(len as usize);
                let bytes = state.stdin[pos..pos + take].to_vec();
                state.stdin_pos += take;
                Ok(bytes)
            }
            CONSOLE_STDOUT | CONSOLE_STDERR => {
                Err(VfsError::NotSupported("read from output console".into()))
            }
            _ => {
                let file = state
                    .handles
                    .get(&handle)
                    .ok_or(VfsError::BadHandle(handle))?;
                let (path, pos) = (file.path.clone(), file.pos);
                let data = state
                    .files
                    .get(&path)
                    .ok_or_else(|| VfsError::NotFound(path.clone()))?;
                let take = data.len().saturating_sub(pos).min(len as usize);
                let bytes = data[pos..pos + take].to_vec();
                if let Some(file) = state.handles.get_mut(&handle) {
                    file.pos += take;
                }
                Ok(bytes)
            }
        }
    }

    fn write(&self, handle: VfsHandle, data: &[u8]) -> VfsResult<u64> {
        let mut state = self.state.lock();
        match handle {
            CONSOLE_STDOUT => {
                state.stdout.extend_from_slice(data);
                Ok(data.len() as u64)
            }
            CONSOLE_STDERR => {
                state.stderr.extend_from_slice(data);
                Ok(data.len() as u64)
            }
            CONSOLE_STDIN => Err(VfsError::NotSupported("write to stdin console".into())),
            _ => {
                let file = state
                    .handles
                    .get(&handle)
                    .ok_or(VfsError::BadHandle(handle))?;
                let (path, pos) = (file.path.clone(), file.pos);
                let buf = state
                    .files
                    .get_mut(&path)
                    .ok_or_else(|| VfsError::NotFound(path.clone()))?;
                if buf.len() < pos + data.len() {
                    buf.resize(pos + data.len(), 0);
                }
                buf[pos..pos + data.len()].copy_from_slice(data);
                if let Some(file) = state.handles.get_mut(&handle) {
                    file.pos += data.len();
                }
                Ok(data.len() as u64)
            }
        }
    }

    fn close(&self, handle: VfsHandle) -> VfsResult<()> {
        if handle < FIRST_FILE_HANDLE {
            return Ok(());
        }
        let mut state = self.state.lock();
        state
            .handles
            .remove(&handle)
            .map(|_| ())
            .ok_or(VfsError::BadHandle(handle))
    }

    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.state.lock().files.contains_key(path)
    }

    fn name(&self) -> &'static str {
        "memvfs"
    }
}

/// Recording VMM fake.
pub struct FakeVmm {
    mappings: Mutex<Vec<(Address, u64, MapAttrs)>>,
}

impl FakeVmm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mappings: Mutex::new(Vec::new()),
        }
    }

    /// Mappings currently live, in request order.
    #[must_use]
    pub fn mappings(&self) -> Vec<(Address, u64, MapAttrs)> {
        self.mappings.lock().clone()
    }
}

impl Default for FakeVmm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vmm for FakeVmm {
    fn map(&self, base: Address, size: u64, attrs: MapAttrs) -> VmmResult<()> {
        if size == 0 {
            return Err(VmmError::BadRange { base, size });
        }
        self.mappings.lock().push((base, size, attrs));
        Ok(())
    }

    fn unmap(&self, base: Address, size: u64) -> VmmResult<()> {
        if size == 0 {
            return Err(VmmError::BadRange { base, size });
        }
        let end = base + size;
        let mut mappings = self.mappings.lock();
        let mut touched = false;
        let mut next = Vec::with_capacity(mappings.len());
        for &(b, s, attrs) in mappings.iter() {
            let e = b + s;
            if e <= base || b >= end {
                next.push((b, s, attrs));
                continue;
            }
            touched = true;
            // Keep the uncovered head and tail of a partially covered mapping
            if b < base {
                next.push((b, base - b, attrs));
            }
            if e > end {
                next.push((end, e - end, attrs));
            }
        }
        if !touched {
            return Err(VmmError::BadRange { base, size });
        }
        *mappings = next;
        Ok(())
    }
}

/// Recording scheduler fake.
pub struct FakeScheduler {
    next_native: AtomicU64,
    yields: AtomicU64,
    terminated: Mutex<Vec<(NativePid, i64)>>,
}

impl FakeScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_native: AtomicU64::new(1),
            yields: AtomicU64::new(0),
            terminated: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn yield_count(&self) -> u64 {
        self.yields.load(Ordering::Relaxed)
    }

    /// (native pid, status) pairs terminated so far.
    #[must_use]
    pub fn terminated(&self) -> Vec<(NativePid, i64)> {
        self.terminated.lock().clone()
    }
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeScheduler for FakeScheduler {
    fn create_process(&self) -> SchedResult<NativePid> {
        Ok(self.next_native.fetch_add(1, Ordering::Relaxed))
    }

    fn yield_now(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    fn terminate(&self, native: NativePid, status: i64) -> SchedResult<()> {
        if native == 0 || native >= self.next_native.load(Ordering::Relaxed) {
            return Err(SchedError::UnknownProcess(native));
        }
        self.terminated.lock().push((native, status));
        Ok(())
    }
}
