//! Module Registry
//!
//! Named collection of loaded modules with library search paths, optionally
//! populated from a [`DllcallConfig`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::error::{FfiError, FfiResult};
use super::loader::SearchPaths;
use super::module::Module;
use super::types::{Argument, CallResult};
use crate::config::DllcallConfig;

/// Registry of loaded modules, keyed by name
pub struct ModuleRegistry {
    search_paths: SearchPaths,
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    /// Create a registry searching the platform default paths
    pub fn new() -> Self {
        Self::with_search_paths(SearchPaths::new())
    }

    pub fn with_search_paths(search_paths: SearchPaths) -> Self {
        Self {
            search_paths,
            modules: HashMap::new(),
        }
    }

    /// Build a registry from configuration, loading every listed module and
    /// resolving its symbols
    pub fn from_config(config: &DllcallConfig) -> FfiResult<Self> {
        let mut search_paths = if config.loader.use_default_paths {
            SearchPaths::new()
        } else {
            SearchPaths::empty()
        };
        for path in &config.loader.search_paths {
            search_paths.add(path);
        }

        let mut registry = Self::with_search_paths(search_paths);
        for entry in &config.modules {
            let module = registry.load(&entry.name, Some(&entry.path))?;
            module.resolve(&entry.symbols)?;
            info!(
                module = %entry.name,
                symbols = entry.symbols.len(),
                "preloaded module"
            );
        }
        Ok(registry)
    }

    /// Add a search path for modules
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.add(path);
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    /// Find a module file by path or name
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        self.search_paths.find_library(name)
    }

    /// Load a module from a path or search for it by name
    ///
    /// Returns the already-registered module if `name` is taken and still
    /// loaded; an entry unloaded behind the registry's back is replaced. When
    /// the file cannot be found in the search paths, `path` is handed to the
    /// OS loader as-is so its own lookup rules apply.
    pub fn load(&mut self, name: &str, path: Option<&str>) -> FfiResult<Arc<Module>> {
        if let Some(module) = self.live_module(name) {
            return Ok(module);
        }

        let target = path.unwrap_or(name);
        let resolved = self
            .find_library(target)
            .unwrap_or_else(|| PathBuf::from(target));

        let module = Arc::new(Module::open(&resolved)?);
        self.modules.insert(name.to_string(), Arc::clone(&module));
        Ok(module)
    }

    /// Load a module from a raw image and register it under `name`
    pub fn load_memory(&mut self, name: &str, image: &[u8]) -> FfiResult<Arc<Module>> {
        if let Some(module) = self.live_module(name) {
            return Ok(module);
        }

        let module = Arc::new(Module::open_memory(image)?);
        self.modules.insert(name.to_string(), Arc::clone(&module));
        Ok(module)
    }

    /// Registered module `name` if it is still loaded; drops a stale entry
    fn live_module(&mut self, name: &str) -> Option<Arc<Module>> {
        let module = self.modules.get(name)?;
        if module.is_loaded() {
            return Some(Arc::clone(module));
        }
        debug!(module = name, "replacing unloaded registry entry");
        self.modules.remove(name);
        None
    }

    /// Get a loaded module
    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.get(name).cloned()
    }

    /// Unregister and unload a module; `Ok(false)` if it was not registered
    pub fn unload(&mut self, name: &str) -> FfiResult<bool> {
        match self.modules.remove(name) {
            Some(module) => {
                module.unload()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// List loaded modules, sorted
    pub fn loaded_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Call a function by qualified name (`module:function`)
    ///
    /// # Safety
    ///
    /// See [`Invoker::call`](super::Invoker::call).
    pub unsafe fn call(&self, qualified_name: &str, args: &[Argument<'_>]) -> FfiResult<CallResult> {
        let (module_name, function) = qualified_name.split_once(':').ok_or_else(|| {
            FfiError::InvalidArgument(format!(
                "expected 'module:function', got '{}'",
                qualified_name
            ))
        })?;

        let module = self
            .modules
            .get(module_name)
            .ok_or_else(|| FfiError::ModuleNotFound(module_name.to_string()))?;
        module.call(function, args)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
