//! Module Loaders
//!
//! The seam between a [`Module`](super::Module) and whatever maps native code
//! into the process. [`SystemLoader`] uses the OS dynamic loader (through
//! libloading) for files and an anonymous memory file for raw images.

use std::ffi::CString;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::debug;

use super::error::{FfiError, FfiResult};
use super::types::Word;

/// A native image mapped into the process
pub trait LoadedImage: Send + Sync {
    /// Address of an exported symbol
    fn symbol(&self, name: &str) -> FfiResult<Word>;

    /// Unmap the image
    fn unload(self: Box<Self>) -> FfiResult<()>;

    /// Human-readable origin, for diagnostics
    fn origin(&self) -> &str;
}

/// Maps file-backed and memory-backed images
pub trait Loader: Send + Sync {
    fn load_file(&self, path: &Path) -> FfiResult<Box<dyn LoadedImage>>;

    /// Load from a raw image; `image` is only borrowed for the duration of the call
    fn load_memory(&self, image: &[u8]) -> FfiResult<Box<dyn LoadedImage>>;
}

/// Loader backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

impl Loader for SystemLoader {
    fn load_file(&self, path: &Path) -> FfiResult<Box<dyn LoadedImage>> {
        let image = NativeImage::open(path)?;
        Ok(Box::new(image))
    }

    fn load_memory(&self, image: &[u8]) -> FfiResult<Box<dyn LoadedImage>> {
        let image = super::memory::load_image(image)?;
        Ok(Box::new(image))
    }
}

/// A library handle from the OS dynamic loader
pub struct NativeImage {
    library: Library,
    origin: String,
    // Memory images keep their backing file open so its descriptor path stays unique.
    backing: Option<std::fs::File>,
}

impl NativeImage {
    /// Load a library from the given path
    pub fn open(path: &Path) -> FfiResult<Self> {
        // Safety: loading a library runs its initializers. The caller vouches
        // for the module it names.
        let library = unsafe {
            Library::new(path).map_err(|e| {
                FfiError::Load(format!(
                    "Failed to load module '{}': {}",
                    path.display(),
                    e
                ))
            })?
        };

        debug!(path = %path.display(), "mapped native module");
        Ok(Self {
            library,
            origin: path.display().to_string(),
            backing: None,
        })
    }

    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    pub(crate) fn from_library(
        library: Library,
        origin: String,
        backing: Option<std::fs::File>,
    ) -> Self {
        Self {
            library,
            origin,
            backing,
        }
    }
}

impl LoadedImage for NativeImage {
    fn symbol(&self, name: &str) -> FfiResult<Word> {
        let c_name = CString::new(name).map_err(|_| {
            FfiError::SymbolNotFound(format!("Invalid symbol name: {:?}", name))
        })?;

        // Safety: the symbol is only read as an address, never dereferenced here.
        let symbol: Symbol<*const ()> = unsafe {
            self.library.get(c_name.as_bytes_with_nul()).map_err(|e| {
                FfiError::SymbolNotFound(format!(
                    "Symbol '{}' not found in '{}': {}",
                    name, self.origin, e
                ))
            })?
        };

        let addr = *symbol as Word;
        if addr == 0 {
            return Err(FfiError::SymbolNotFound(format!(
                "Symbol '{}' in '{}' resolved to a null address",
                name, self.origin
            )));
        }
        Ok(addr)
    }

    fn unload(self: Box<Self>) -> FfiResult<()> {
        let NativeImage {
            library,
            origin,
            backing,
        } = *self;
        let result = library
            .close()
            .map_err(|e| FfiError::Unload(format!("Failed to unload '{}': {}", origin, e)));
        drop(backing);
        result
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}

/// Directories searched when a module is named rather than given as a path
#[derive(Debug, Clone)]
pub struct SearchPaths {
    paths: Vec<PathBuf>,
}

impl SearchPaths {
    /// Platform default search paths
    pub fn new() -> Self {
        Self {
            paths: default_search_paths(),
        }
    }

    /// No directories at all
    pub fn empty() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn add(&mut self, path: impl AsRef<Path>) {
        self.paths.push(path.as_ref().to_path_buf());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Find a module by path or by name
    ///
    /// An existing path wins; otherwise the platform file name for `name` is
    /// looked up in each directory in order.
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.exists() {
            return Some(path.to_path_buf());
        }

        let lib_name = library_filename(name);
        self.paths
            .iter()
            .map(|dir| dir.join(&lib_name))
            .find(|candidate| candidate.exists())
    }
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Directories the system loader itself searches, lowest priority
#[cfg(target_os = "linux")]
const SYSTEM_LIBRARY_DIRS: &[&str] = &["/lib", "/lib64", "/usr/lib", "/usr/lib64", "/usr/local/lib"];
#[cfg(target_os = "macos")]
const SYSTEM_LIBRARY_DIRS: &[&str] = &["/usr/lib", "/usr/local/lib", "/opt/homebrew/lib"];
#[cfg(windows)]
const SYSTEM_LIBRARY_DIRS: &[&str] = &["C:\\Windows\\System32"];
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
const SYSTEM_LIBRARY_DIRS: &[&str] = &["/usr/lib", "/usr/local/lib"];

/// Environment variable holding extra library directories
#[cfg(target_os = "macos")]
const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
const LIBRARY_PATH_VAR: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Working directory, then the library path variable, then system directories
fn default_search_paths() -> Vec<PathBuf> {
    let env_dirs: Vec<PathBuf> = std::env::var_os(LIBRARY_PATH_VAR)
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();

    let candidates = std::env::current_dir()
        .ok()
        .into_iter()
        .chain(env_dirs)
        .chain(SYSTEM_LIBRARY_DIRS.iter().map(PathBuf::from));

    let mut paths: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if !dir.as_os_str().is_empty() && !paths.contains(&dir) {
            paths.push(dir);
        }
    }
    paths
}

/// Platform file name for a bare library name (`m` → `libm.so`)
///
/// Names that already carry the platform suffix, or a versioned `.so.N`
/// suffix on ELF platforms, are returned unchanged.
pub fn library_filename(name: &str) -> String {
    use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};

    let lower = name.to_ascii_lowercase();
    let versioned_so = DLL_SUFFIX == ".so" && lower.contains(".so.");
    if lower.ends_with(DLL_SUFFIX) || versioned_so {
        name.to_string()
    } else {
        format!("{}{}{}", DLL_PREFIX, name, DLL_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_filename() {
        #[cfg(target_os = "linux")]
        {
            assert_eq!(library_filename("m"), "libm.so");
            assert_eq!(library_filename("libc.so.6"), "libc.so.6");
        }
        #[cfg(target_os = "macos")]
        assert_eq!(library_filename("m"), "libm.dylib");
        #[cfg(target_os = "windows")]
        {
            assert_eq!(library_filename("kernel32"), "kernel32.dll");
            assert_eq!(library_filename("USER32.DLL"), "USER32.DLL");
        }
    }

    #[test]
    fn test_default_paths_have_no_duplicates() {
        let paths = SearchPaths::new();
        let dirs = paths.paths();
        assert!(!dirs.is_empty());
        for (i, dir) in dirs.iter().enumerate() {
            assert!(!dir.as_os_str().is_empty());
            assert!(!dirs[i + 1..].contains(dir));
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = SystemLoader
            .load_file(Path::new("/definitely/not/here/libnothing.so"))
            .err()
            .unwrap();
        assert!(matches!(err, FfiError::Load(_)));
        assert!(err.to_string().contains("libnothing"));
    }

    #[test]
    fn test_find_library_in_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(library_filename("scratchlib"));
        std::fs::write(&file, b"not really a library").unwrap();

        let mut paths = SearchPaths::empty();
        assert!(paths.find_library("scratchlib").is_none());
        paths.add(dir.path());
        assert_eq!(paths.find_library("scratchlib"), Some(file));
    }

    #[test]
    fn test_find_library_existing_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let name = file.path().to_str().unwrap();
        let paths = SearchPaths::empty();
        assert_eq!(paths.find_library(name), Some(file.path().to_path_buf()));
    }
}
