//! Dynamic Native Calls
//!
//! Loads native modules from a file or from a raw in-memory image, resolves
//! exported functions by name, and calls them with dynamically-typed
//! arguments marshaled into a fixed-arity word frame.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   │  Module::from_file / from_memory → load()
//!   ▼
//! Module ──── Loader (libloading / memfd) ──── native image
//!   │  resolve(["add2", ...])
//!   ▼
//! Symbol Table (name → address)
//!   │  invoker().call("add2", &[2.into(), 3.into()])
//!   ▼
//! Argument Marshaler ──► CallFrame [Word; 15]
//!   │
//!   ▼
//! Native Call Primitive ──► CallResult { primary, secondary, errno }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dllcall::ffi::{Argument, Module};
//!
//! let module = Module::open("libtestmod.so")?;
//! module.resolve(["add2"])?;
//! let result = unsafe { module.call("add2", &[Argument::I32(2), Argument::I32(3)])? };
//! assert_eq!(result.as_i32(), 5);
//! ```

mod error;
mod invoker;
mod loader;
pub mod marshal;
mod memory;
mod module;
mod platform;
mod registry;
mod symbols;
mod types;

pub use error::{FfiError, FfiResult};
pub use invoker::{CallPrimitive, Invoker, NativeCall};
pub use loader::{library_filename, LoadedImage, Loader, NativeImage, SearchPaths, SystemLoader};
pub use marshal::CallFrame;
pub use module::{Module, ModuleSource};
pub use registry::ModuleRegistry;
pub use symbols::SymbolTable;
pub use types::{
    ArgKind, Argument, CallResult, Errno, IntRef, NativeInt, OutBuf, Word, MAX_ARGS,
};
