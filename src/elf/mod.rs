/*!
 * ELF Module
 * Executable image parsing
 */

pub mod loader;

pub use loader::{parse, ImageDescriptor, LoaderError, LoaderResult};
