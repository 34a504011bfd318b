/*!
 * File Descriptor Table
 *
 * Fixed-capacity per-process mapping from small integers to open-handle
 * state. Descriptors 0/1/2 are seeded at creation as the standard streams
 * and are never handed out by the generic allocator.
 *
 * Allocation policy: cursor-based. `allocate` scans forward from `next_fd`;
 * on a miss it wraps once, scanning from the first allocatable slot (3), and
 * only then reports exhaustion. A descriptor released below the cursor is
 * therefore not reused until the cursor wraps past the end of the table.
 */

use crate::core::limits::{
    CONSOLE_STDERR, CONSOLE_STDIN, CONSOLE_STDOUT, FIRST_ALLOCATABLE_FD, MAX_FDS, STDERR_FD,
    STDIN_FD, STDOUT_FD,
};
use crate::core::types::{Fd, VfsHandle};
use log::trace;
use thiserror::Error;

/// FD table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FdTableError {
    #[error("descriptor table full ({0} slots)")]
    Exhausted(usize),
}

/// One active descriptor record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdEntry {
    /// Open flags as passed by the foreign process
    pub flags: u32,
    /// Backing VFS handle; None for a slot allocated but not yet opened
    pub backing: Option<VfsHandle>,
}

impl FdEntry {
    #[inline]
    #[must_use]
    const fn cleared() -> Self {
        Self {
            flags: 0,
            backing: None,
        }
    }
}

/// Fixed-capacity descriptor table; a `None` slot is inactive.
#[derive(Debug, Clone)]
pub struct FdTable {
    slots: [Option<FdEntry>; MAX_FDS],
    next_fd: Fd,
}

impl FdTable {
    /// Create a table with the three standard descriptors pre-activated.
    #[must_use]
    pub fn new() -> Self {
        let mut slots = [None; MAX_FDS];
        slots[STDIN_FD] = Some(FdEntry {
            flags: 0,
            backing: Some(CONSOLE_STDIN),
        });
        slots[STDOUT_FD] = Some(FdEntry {
            flags: 0,
            backing: Some(CONSOLE_STDOUT),
        });
        slots[STDERR_FD] = Some(FdEntry {
            flags: 0,
            backing: Some(CONSOLE_STDERR),
        });
        Self {
            slots,
            next_fd: FIRST_ALLOCATABLE_FD,
        }
    }

    /// Allocate the first inactive slot at or above the cursor, wrapping once.
    pub fn allocate(&mut self) -> Result<Fd, FdTableError> {
        let fd = self
            .scan(self.next_fd, MAX_FDS)
            .or_else(|| self.scan(FIRST_ALLOCATABLE_FD, self.next_fd))
            .ok_or(FdTableError::Exhausted(MAX_FDS))?;
        self.slots[fd] = Some(FdEntry::cleared());
        self.next_fd = fd + 1;
        trace!("allocated fd {} (cursor now {})", fd, self.next_fd);
        Ok(fd)
    }

    fn scan(&self, from: Fd, to: Fd) -> Option<Fd> {
        (from.max(FIRST_ALLOCATABLE_FD)..to.min(MAX_FDS)).find(|&fd| self.slots[fd].is_none())
    }

    /// Deactivate a slot, returning the record that was in it.
    ///
    /// Idempotent: releasing an inactive or out-of-range fd returns None and
    /// is never an error at this layer. The syscall wrapping it decides
    /// whether that deserves an errno.
    pub fn release(&mut self, fd: Fd) -> Option<FdEntry> {
        if fd >= MAX_FDS {
            return None;
        }
        self.slots[fd].take()
    }

    /// Look up an active descriptor.
    #[inline]
    #[must_use]
    pub fn lookup(&self, fd: Fd) -> Option<&FdEntry> {
        self.slots.get(fd).and_then(|slot| slot.as_ref())
    }

    /// Record the backing handle and flags of an allocated descriptor.
    pub fn set_backing(&mut self, fd: Fd, handle: VfsHandle, flags: u32) {
        if let Some(Some(entry)) = self.slots.get_mut(fd) {
            entry.backing = Some(handle);
            entry.flags = flags;
        }
    }

    /// Number of active descriptors, stdio included.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Iterate over active descriptors.
    pub fn iter_active(&self) -> impl Iterator<Item = (Fd, &FdEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(fd, slot)| slot.as_ref().map(|entry| (fd, entry)))
    }

    /// Deactivate every slot, returning the released records.
    /// Used at context destruction so backing resources can be closed.
    pub fn drain(&mut self) -> Vec<(Fd, FdEntry)> {
        let mut released = Vec::with_capacity(self.active_count());
        for fd in 0..MAX_FDS {
            if let Some(entry) = self.slots[fd].take() {
                released.push((fd, entry));
            }
        }
        self.next_fd = FIRST_ALLOCATABLE_FD;
        released
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_seeded() {
        let table = FdTable::new();
        assert_eq!(table.active_count(), 3);
        assert_eq!(table.lookup(0).unwrap().backing, Some(CONSOLE_STDIN));
        assert_eq!(table.lookup(1).unwrap().backing, Some(CONSOLE_STDOUT));
        assert_eq!(table.lookup(2).unwrap().backing, Some(CONSOLE_STDERR));
    }

    #[test]
    fn test_allocate_starts_at_three() {
        let mut table = FdTable::new();
        assert_eq!(table.allocate().unwrap(), 3);
        assert_eq!(table.allocate().unwrap(), 4);
    }

    #[test]
    fn test_cursor_skips_released_slot_until_wrap() {
        let mut table = FdTable::new();
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        assert_eq!((a, b), (3, 4));

        // Releasing below the cursor does not make the slot immediately
        // reusable under the cursor policy.
        table.release(a);
        assert_eq!(table.allocate().unwrap(), 5);
    }

    #[test]
    fn test_wrap_finds_released_slot_when_upper_region_full() {
        let mut table = FdTable::new();
        for _ in FIRST_ALLOCATABLE_FD..MAX_FDS {
            table.allocate().unwrap();
        }
        assert_eq!(table.allocate(), Err(FdTableError::Exhausted(MAX_FDS)));

        table.release(7);
        assert_eq!(table.allocate().unwrap(), 7);
        assert_eq!(table.allocate(), Err(FdTableError::Exhausted(MAX_FDS)));
    }

    #[test]
    fn test_release_idempotent() {
        let mut table = FdTable::new();
        let fd = table.allocate().unwrap();
        assert!(table.release(fd).is_some());
        assert!(table.release(fd).is_none());
        assert!(table.release(MAX_FDS + 10).is_none());
    }

    #[test]
    fn test_drain_clears_everything() {
        let mut table = FdTable::new();
        table.allocate().unwrap();
        let released = table.drain();
        assert_eq!(released.len(), 4);
        assert_eq!(table.active_count(), 0);
        assert!(table.lookup(0).is_none());
    }
}
