//! Native Module
//!
//! Owns one loaded image (file-backed or memory-backed) and its symbol table.
//!
//! # Locking
//!
//! All mutable state sits behind one `RwLock`. `load`, `unload` and `resolve`
//! take it exclusively; calls through an [`Invoker`] hold it shared for the
//! whole native call. Calls to already-resolved functions therefore run in
//! parallel, and `unload` waits for in-flight calls before unmapping code.
//!
//! Shared acquisitions are recursive: a callee may call back into the same
//! module (`call`, `is_loaded`, `symbol`, ...) even while another thread is
//! queued on `unload` or `resolve`. A callee that itself calls `load`,
//! `unload` or `resolve` on the same module deadlocks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use super::error::{FfiError, FfiResult};
use super::invoker::Invoker;
use super::loader::{LoadedImage, Loader, SystemLoader};
use super::symbols::{normalize_name, SymbolTable};
use super::types::{Argument, CallResult, Word};

/// Where a module's code comes from
#[derive(Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A path handed to the OS loader
    File(PathBuf),
    /// A module-owned copy of a raw image
    Memory(Box<[u8]>),
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::File(path) => f.debug_tuple("File").field(path).finish(),
            ModuleSource::Memory(image) => write!(f, "Memory({} bytes)", image.len()),
        }
    }
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::File(path) => write!(f, "{}", path.display()),
            ModuleSource::Memory(image) => write!(f, "<memory image, {} bytes>", image.len()),
        }
    }
}

enum Lifecycle {
    /// Constructed, never loaded
    Fresh,
    Loaded(Box<dyn LoadedImage>),
    /// Unloaded; a new `Module` is needed to load again
    Released,
}

pub(crate) struct ModuleState {
    lifecycle: Lifecycle,
    symbols: SymbolTable,
}

impl ModuleState {
    fn is_loaded(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Loaded(_))
    }

    /// Call-time address lookup
    pub(crate) fn address_of(&self, name: &str) -> FfiResult<Word> {
        if !self.is_loaded() {
            return Err(FfiError::NotLoaded);
        }
        if self.symbols.is_empty() {
            return Err(FfiError::NotInitialized);
        }
        self.symbols
            .get(name)
            .ok_or_else(|| FfiError::SymbolNotExist(name.to_string()))
    }
}

/// A native module and its resolved symbols
pub struct Module {
    source: ModuleSource,
    loader: Arc<dyn Loader>,
    state: RwLock<ModuleState>,
}

impl Module {
    /// File-backed module, not yet loaded
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::with_loader(
            ModuleSource::File(path.as_ref().to_path_buf()),
            Arc::new(SystemLoader),
        )
    }

    /// Memory-backed module, not yet loaded
    ///
    /// `image` is copied; the caller keeps its buffer and may change it freely.
    pub fn from_memory(image: &[u8]) -> Self {
        Self::with_loader(ModuleSource::Memory(image.into()), Arc::new(SystemLoader))
    }

    /// Module using a custom loader
    pub fn with_loader(source: ModuleSource, loader: Arc<dyn Loader>) -> Self {
        Self {
            source,
            loader,
            state: RwLock::new(ModuleState {
                lifecycle: Lifecycle::Fresh,
                symbols: SymbolTable::new(),
            }),
        }
    }

    /// Construct and load a file-backed module
    pub fn open(path: impl AsRef<Path>) -> FfiResult<Self> {
        let module = Self::from_file(path);
        module.load()?;
        Ok(module)
    }

    /// Construct and load a memory-backed module
    pub fn open_memory(image: &[u8]) -> FfiResult<Self> {
        let module = Self::from_memory(image);
        module.load()?;
        Ok(module)
    }

    pub fn source(&self) -> &ModuleSource {
        &self.source
    }

    /// The module-owned image copy (memory-backed modules only)
    pub fn image_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            ModuleSource::Memory(image) => Some(image),
            ModuleSource::File(_) => None,
        }
    }

    /// Map the module into the process
    ///
    /// Loading an already-loaded module does nothing. A module that has been
    /// unloaded cannot be loaded again.
    pub fn load(&self) -> FfiResult<()> {
        let mut state = self.state.write();
        match state.lifecycle {
            Lifecycle::Loaded(_) => return Ok(()),
            Lifecycle::Released => {
                return Err(FfiError::Load(format!(
                    "module '{}' was unloaded; construct a new Module to load it again",
                    self.source
                )));
            }
            Lifecycle::Fresh => {}
        }

        let image = match &self.source {
            ModuleSource::File(path) => self.loader.load_file(path)?,
            ModuleSource::Memory(bytes) => {
                if bytes.is_empty() {
                    return Err(FfiError::Load("module image is empty".to_string()));
                }
                self.loader.load_memory(bytes)?
            }
        };

        debug!(module = %self.source, origin = image.origin(), "module loaded");
        state.lifecycle = Lifecycle::Loaded(image);
        Ok(())
    }

    /// Release the native handle and forget all resolved symbols
    ///
    /// Unloading a module that is not loaded is a no-op. If the OS loader
    /// refuses to unmap the image the error is returned, but the module is
    /// considered unloaded either way.
    pub fn unload(&self) -> FfiResult<()> {
        let mut state = self.state.write();
        if !state.is_loaded() {
            return Ok(());
        }

        let lifecycle = std::mem::replace(&mut state.lifecycle, Lifecycle::Released);
        state.symbols.clear();
        drop(state);

        if let Lifecycle::Loaded(image) = lifecycle {
            if let Err(e) = image.unload() {
                warn!(module = %self.source, error = %e, "module unload failed");
                return Err(e);
            }
        }
        debug!(module = %self.source, "module unloaded");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read_recursive().is_loaded()
    }

    /// Resolve exported function names into the symbol table
    ///
    /// Names are trimmed of surrounding whitespace. Re-resolving a name
    /// overwrites its entry. Resolution is not atomic: when a name fails, the
    /// names before it stay resolved.
    pub fn resolve<I, S>(&self, names: I) -> FfiResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.write();
        let ModuleState { lifecycle, symbols } = &mut *state;

        for raw in names {
            let name = normalize_name(raw.as_ref()).ok_or_else(|| {
                FfiError::InvalidArgument("function name could not be empty".to_string())
            })?;
            let image = match &*lifecycle {
                Lifecycle::Loaded(image) => image,
                _ => return Err(FfiError::NotLoaded),
            };
            let addr = image.symbol(name)?;
            debug!(symbol = name, addr = format_args!("{:#x}", addr), "resolved");
            symbols.insert(name, addr);
        }
        Ok(())
    }

    /// Resolved address of `name`, if any
    pub fn symbol(&self, name: &str) -> Option<Word> {
        self.state.read_recursive().symbols.get(name)
    }

    /// All resolved names, sorted
    pub fn symbol_names(&self) -> Vec<String> {
        self.state.read_recursive().symbols.names()
    }

    /// Invoker bound to this module using the native call primitive
    pub fn invoker(&self) -> Invoker<'_> {
        Invoker::new(self)
    }

    /// Call a resolved function; shorthand for `self.invoker().call(..)`
    ///
    /// # Safety
    ///
    /// See [`Invoker::call`].
    pub unsafe fn call(&self, name: &str, args: &[Argument<'_>]) -> FfiResult<CallResult> {
        self.invoker().call(name, args)
    }

    /// Shared state for the duration of a call
    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, ModuleState> {
        self.state.read_recursive()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read_recursive();
        f.debug_struct("Module")
            .field("source", &self.source)
            .field("loaded", &state.is_loaded())
            .field("symbols", &state.symbols.len())
            .finish()
    }
}
