/*!
 * Process Module
 * Emulated process state and lifecycle orchestration
 */

pub mod context;
pub mod fd_table;
pub mod lifecycle;
pub mod registry;
pub mod types;

pub use context::{ContextSnapshot, ProcessContext};
pub use fd_table::{FdEntry, FdTable, FdTableError};
pub use lifecycle::LifecycleManager;
pub use registry::ContextRegistry;
pub use types::{Credentials, ProcessError, ProcessResult, ProcessState, SignalDisposition};
