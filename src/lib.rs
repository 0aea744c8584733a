//! dllcall - call native module exports by name with dynamically-typed arguments
//!
//! Load a native module from a file or straight from memory, resolve its
//! exported functions, and invoke them without knowing their signatures at
//! compile time.
//!
//! # Features
//!
//! - **File and memory modules**: the OS loader for paths, an anonymous
//!   memory file for raw images (no disk writes)
//! - **Explicit symbol resolution**: addresses are cached per module and never
//!   looked up implicitly at call time
//! - **Closed argument model**: [`Argument`] enumerates every supported kind,
//!   each with one marshaling rule into a native word
//! - **Fixed call frame**: up to [`MAX_ARGS`] word arguments, raw result words
//!   plus the platform error code
//! - **Registry and config**: named modules, search paths, `dllcall.toml`
//!   preloading
//!
//! # Example
//!
//! ```no_run
//! use dllcall::{Argument, Module};
//!
//! # fn main() -> Result<(), dllcall::FfiError> {
//! let module = Module::open("./libtestmod.so")?;
//! module.resolve(["add2"])?;
//!
//! let result = unsafe { module.call("add2", &[Argument::I32(2), Argument::I32(3)])? };
//! assert_eq!(result.as_i32(), 5);
//!
//! module.unload()?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod ffi;

pub use config::{ConfigError, DllcallConfig, LoaderConfig, ModuleConfig};
pub use ffi::{
    ArgKind, Argument, CallPrimitive, CallResult, Errno, FfiError, FfiResult, Invoker, Module,
    ModuleRegistry, ModuleSource, NativeCall, Word, MAX_ARGS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
