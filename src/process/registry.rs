/*!
 * Context Registry
 *
 * Owned registry of live process contexts. There is no ambient singleton:
 * whoever creates and destroys contexts holds the registry and passes it by
 * reference. The pid counter is monotonic and seeded above the reserved low
 * pid range.
 */

use crate::core::limits::PID_BASE;
use crate::core::types::{NativePid, Pid};
use crate::process::context::ProcessContext;
use crate::process::types::Credentials;
use ahash::AHashMap;
use log::{debug, info};

/// Registry of live contexts, keyed by emulated pid.
#[derive(Debug)]
pub struct ContextRegistry {
    contexts: AHashMap<Pid, ProcessContext>,
    next_pid: Pid,
}

impl ContextRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            contexts: AHashMap::new(),
            next_pid: PID_BASE,
        }
    }

    /// Create a context with a fresh pid. `ppid` is zero for a root process.
    pub fn create(&mut self, ppid: Pid, native_pid: NativePid, creds: Credentials) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        let ctx = ProcessContext::new(pid, ppid, native_pid, creds);
        info!(
            "created context pid {} (ppid {}, native {})",
            pid, ppid, native_pid
        );
        self.contexts.insert(pid, ctx);
        pid
    }

    #[inline]
    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&ProcessContext> {
        self.contexts.get(&pid)
    }

    #[inline]
    #[must_use]
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessContext> {
        self.contexts.get_mut(&pid)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, pid: Pid) -> bool {
        self.contexts.contains_key(&pid)
    }

    /// Remove a context, transferring ownership to the caller so backing
    /// resources can be released. Safe to call once per pid; a second call
    /// simply finds nothing.
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessContext> {
        let ctx = self.contexts.remove(&pid);
        if ctx.is_some() {
            debug!("removed context pid {}", pid);
        }
        ctx
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Live pids, unordered.
    #[must_use]
    pub fn pids(&self) -> Vec<Pid> {
        self.contexts.keys().copied().collect()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pids_monotonic_and_seeded() {
        let mut registry = ContextRegistry::new();
        let a = registry.create(0, 1, Credentials::root());
        let b = registry.create(a, 2, Credentials::root());
        assert!(a >= PID_BASE);
        assert_eq!(b, a + 1);
        assert_eq!(registry.get(b).unwrap().ppid(), a);
    }

    #[test]
    fn test_pid_not_recycled_after_remove() {
        let mut registry = ContextRegistry::new();
        let a = registry.create(0, 1, Credentials::root());
        registry.remove(a);
        let b = registry.create(0, 2, Credentials::root());
        assert!(b > a);
    }

    #[test]
    fn test_remove_twice_is_none() {
        let mut registry = ContextRegistry::new();
        let pid = registry.create(0, 1, Credentials::root());
        assert!(registry.remove(pid).is_some());
        assert!(registry.remove(pid).is_none());
    }
}
