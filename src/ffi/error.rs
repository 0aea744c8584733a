//! Error taxonomy for module loading, symbol resolution and dynamic calls.

use thiserror::Error;

use super::types::ArgKind;

/// Error type for dllcall operations
///
/// Every error is reported synchronously to the caller of the failing
/// operation and nothing is retried internally. The outcome of a native call
/// is never an error here: see [`CallResult::errno`](super::CallResult::errno).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FfiError {
    /// The module could not be mapped into the process
    #[error("Load error: {0}")]
    Load(String),

    /// The OS loader refused to unmap the module (the handle is cleared anyway)
    #[error("Unload error: {0}")]
    Unload(String),

    /// No module registered under this name
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// The operation requires a loaded module
    #[error("Module is not loaded")]
    NotLoaded,

    /// Empty function name, empty byte sequence, interior NUL in text
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The active loader could not find an exported name
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A call named a function that was never resolved
    #[error("Function address not resolved: {0}")]
    SymbolNotExist(String),

    /// No marshaling rule applies to this argument kind
    #[error("Unsupported argument type: cannot convert {kind} to a native word")]
    UnsupportedArgumentType { kind: ArgKind },

    /// More arguments than the fixed call frame holds
    #[error("Too many arguments: {count} (max {max})")]
    TooManyArguments { count: usize, max: usize },

    /// `call` before any symbol was resolved on the module
    #[error("Function addresses not initialized: resolve symbols before calling")]
    NotInitialized,
}

/// Result type for dllcall operations
pub type FfiResult<T> = Result<T, FfiError>;
