/*!
 * Syscall Module
 * Dispatch table, executor, and per-concern handler blocks
 */

pub mod executor;
mod fs;
mod memory;
mod process;
pub mod table;
pub mod types;

pub use executor::{DispatchStats, Persona, PersonaBuilder};
pub use table::{SyscallFn, SyscallTable};
pub use types::{HandlerResult, SyscallArgs, SyscallError};
