/*!
 * Process Context
 *
 * Aggregate per-process state for one emulated foreign process: identity,
 * descriptor table, working directory, environment, address-space break, and
 * signal handler slots.
 *
 * A context has exactly one logical owner (the lifecycle manager); syscall
 * handlers receive a borrowed reference for the duration of the call only.
 */

use crate::core::limits::{DEFAULT_BRK_BASE, MAX_SIGNALS, PATH_MAX};
use crate::core::types::{Address, NativePid, Pid, Signal};
use crate::process::fd_table::FdTable;
use crate::process::types::{
    Credentials, ProcessError, ProcessResult, ProcessState, SignalDisposition,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Per-process persona state.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pid: Pid,
    ppid: Pid,
    creds: Credentials,
    state: ProcessState,
    native_pid: NativePid,

    pub fds: FdTable,

    cwd: String,
    env: Vec<String>,

    brk_start: Address,
    brk_current: Address,

    image: Option<(Address, u64)>,

    signals: [SignalDisposition; MAX_SIGNALS],
}

impl ProcessContext {
    /// Create a fresh context in the Created state: stdio descriptors seeded,
    /// cwd at the root, break collapsed to its start, all signal slots at
    /// their default disposition.
    #[must_use]
    pub fn new(pid: Pid, ppid: Pid, native_pid: NativePid, creds: Credentials) -> Self {
        Self {
            pid,
            ppid,
            creds,
            state: ProcessState::Created,
            native_pid,
            fds: FdTable::new(),
            cwd: "/".to_string(),
            env: Vec::new(),
            brk_start: DEFAULT_BRK_BASE,
            brk_current: DEFAULT_BRK_BASE,
            image: None,
            signals: [SignalDisposition::Default; MAX_SIGNALS],
        }
    }

    // Identity ---------------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    #[must_use]
    pub const fn ppid(&self) -> Pid {
        self.ppid
    }

    #[inline]
    #[must_use]
    pub const fn creds(&self) -> Credentials {
        self.creds
    }

    #[inline]
    #[must_use]
    pub const fn native_pid(&self) -> NativePid {
        self.native_pid
    }

    // State machine ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ProcessState {
        self.state
    }

    /// Transition the state machine, rejecting illegal moves.
    pub fn transition(&mut self, to: ProcessState) -> ProcessResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(ProcessError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        debug!("pid {}: {:?} -> {:?}", self.pid, self.state, to);
        self.state = to;
        Ok(())
    }

    // Working directory ------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Replace the working directory. The path must be absolute and bounded.
    pub fn set_cwd(&mut self, path: &str) -> ProcessResult<()> {
        if !path.starts_with('/') || path.len() >= PATH_MAX {
            return Err(ProcessError::InvalidPath(path.to_string()));
        }
        self.cwd.clear();
        self.cwd.push_str(path);
        Ok(())
    }

    // Environment ------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Replace the environment wholesale (execve semantics).
    pub fn set_env(&mut self, env: Vec<String>) {
        self.env = env;
    }

    // Address-space break ----------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn brk_start(&self) -> Address {
        self.brk_start
    }

    #[inline]
    #[must_use]
    pub const fn brk_current(&self) -> Address {
        self.brk_current
    }

    /// Move the break. Requests below the immutable start are rejected and
    /// leave the current break unchanged.
    pub fn set_brk(&mut self, addr: Address) -> ProcessResult<()> {
        if addr < self.brk_start {
            return Err(ProcessError::BrkBelowStart {
                requested: addr,
                start: self.brk_start,
            });
        }
        self.brk_current = addr;
        Ok(())
    }

    /// Rebase the heap after an image replacement. Both pointers collapse to
    /// the new start.
    pub fn rebase_brk(&mut self, start: Address) {
        self.brk_start = start;
        self.brk_current = start;
    }

    // Image -----------------------------------------------------------------

    /// Mapped range of the image backing this context, if one is loaded.
    /// The lifecycle manager unmaps it when the image is replaced.
    #[inline]
    #[must_use]
    pub const fn image_range(&self) -> Option<(Address, u64)> {
        self.image
    }

    /// Record the mapped range of the image now backing this context.
    pub fn set_image(&mut self, base: Address, mapped_size: u64) {
        self.image = Some((base, mapped_size));
    }

    // Signal slots -----------------------------------------------------------

    /// Fetch a recorded disposition. Signal numbers are 1-based.
    #[must_use]
    pub fn signal_disposition(&self, sig: Signal) -> Option<SignalDisposition> {
        if sig == 0 || sig > MAX_SIGNALS {
            return None;
        }
        Some(self.signals[sig - 1])
    }

    /// Record a disposition, returning the previous one.
    pub fn set_signal_disposition(
        &mut self,
        sig: Signal,
        disposition: SignalDisposition,
    ) -> Option<SignalDisposition> {
        if sig == 0 || sig > MAX_SIGNALS {
            return None;
        }
        let old = self.signals[sig - 1];
        self.signals[sig - 1] = disposition;
        Some(old)
    }

    /// Reset every slot to the default disposition (execve semantics: handler
    /// addresses from the old image are meaningless in the new one).
    pub fn reset_signals(&mut self) {
        self.signals = [SignalDisposition::Default; MAX_SIGNALS];
    }

    /// Snapshot for introspection and logs.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            pid: self.pid,
            ppid: self.ppid,
            state: self.state,
            creds: self.creds,
            open_fds: self.fds.active_count(),
            cwd: self.cwd.clone(),
            brk_start: self.brk_start,
            brk_current: self.brk_current,
        }
    }
}

/// Read-only context snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContextSnapshot {
    pub pid: Pid,
    pub ppid: Pid,
    pub state: ProcessState,
    pub creds: Credentials,
    pub open_fds: usize,
    pub cwd: String,
    pub brk_start: Address,
    pub brk_current: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProcessContext {
        ProcessContext::new(100, 1, 7, Credentials::new(1000, 1000))
    }

    #[test]
    fn test_fresh_context_shape() {
        let ctx = ctx();
        assert_eq!(ctx.state(), ProcessState::Created);
        assert_eq!(ctx.cwd(), "/");
        assert_eq!(ctx.brk_current(), ctx.brk_start());
        assert_eq!(ctx.fds.active_count(), 3);
        assert!(ctx.env().is_empty());
    }

    #[test]
    fn test_brk_below_start_rejected() {
        let mut ctx = ctx();
        let before = ctx.brk_current();
        assert!(ctx.set_brk(ctx.brk_start() - 1).is_err());
        assert_eq!(ctx.brk_current(), before);
    }

    #[test]
    fn test_brk_can_lower_to_start() {
        let mut ctx = ctx();
        ctx.set_brk(ctx.brk_start() + 0x2000).unwrap();
        ctx.set_brk(ctx.brk_start()).unwrap();
        assert_eq!(ctx.brk_current(), ctx.brk_start());
    }

    #[test]
    fn test_signal_slots_bounds() {
        let mut ctx = ctx();
        assert!(ctx.signal_disposition(0).is_none());
        assert!(ctx.signal_disposition(MAX_SIGNALS + 1).is_none());
        let old = ctx
            .set_signal_disposition(9, SignalDisposition::Ignore)
            .unwrap();
        assert_eq!(old, SignalDisposition::Default);
        assert_eq!(
            ctx.signal_disposition(9).unwrap(),
            SignalDisposition::Ignore
        );
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut ctx = ctx();
        ctx.transition(ProcessState::Running).unwrap();
        ctx.transition(ProcessState::Exited).unwrap();
        assert!(ctx.transition(ProcessState::Running).is_err());
    }

    #[test]
    fn test_relative_cwd_rejected() {
        let mut ctx = ctx();
        assert!(ctx.set_cwd("tmp/work").is_err());
        assert_eq!(ctx.cwd(), "/");
    }
}
