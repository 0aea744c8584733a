//! Registry and Configuration Tests

#[macro_use]
mod common;

use dllcall::{Argument, DllcallConfig, FfiError, ModuleConfig, ModuleRegistry};
use dllcall::ffi::SearchPaths;

#[test]
fn test_empty_registry() {
    let registry = ModuleRegistry::with_search_paths(SearchPaths::empty());
    assert!(registry.loaded_modules().is_empty());
    assert!(registry.get("anything").is_none());
}

#[test]
fn test_call_unknown_module() {
    let registry = ModuleRegistry::with_search_paths(SearchPaths::empty());
    let err = unsafe { registry.call("nope:add2", &[]) }.unwrap_err();
    assert_eq!(err, FfiError::ModuleNotFound("nope".to_string()));

    let err = unsafe { registry.call("no_separator", &[]) }.unwrap_err();
    assert!(matches!(err, FfiError::InvalidArgument(_)));
}

#[test]
fn test_load_by_name_from_search_path() {
    let path = require_fixture!();
    let mut registry = ModuleRegistry::with_search_paths(SearchPaths::empty());
    registry.add_search_path(path.parent().unwrap());

    let module = registry.load("testmod", None).unwrap();
    assert!(module.is_loaded());
    module.resolve(["add2"]).unwrap();

    let again = registry.load("testmod", None).unwrap();
    assert!(std::sync::Arc::ptr_eq(&module, &again));

    let result = unsafe { registry.call("testmod:add2", &[Argument::I32(7), Argument::I32(8)]) }
        .unwrap();
    assert_eq!(result.as_i32(), 15);

    assert_eq!(registry.loaded_modules(), vec!["testmod"]);
    assert!(registry.unload("testmod").unwrap());
    assert!(!registry.unload("testmod").unwrap());
    assert!(!module.is_loaded());
}

#[test]
fn test_load_replaces_module_unloaded_elsewhere() {
    let path = require_fixture!();
    let path = path.display().to_string();
    let mut registry = ModuleRegistry::with_search_paths(SearchPaths::empty());

    let first = registry.load("fx", Some(&path)).unwrap();
    first.unload().unwrap();

    let second = registry.load("fx", Some(&path)).unwrap();
    assert!(second.is_loaded());
    assert!(!std::sync::Arc::ptr_eq(&first, &second));

    second.resolve(["add2"]).unwrap();
    let result = unsafe { registry.call("fx:add2", &[Argument::I32(4), Argument::I32(5)]) }
        .unwrap();
    assert_eq!(result.as_i32(), 9);
}

#[cfg(target_os = "linux")]
#[test]
fn test_load_memory_replaces_module_unloaded_elsewhere() {
    let path = require_fixture!();
    let image = std::fs::read(&path).unwrap();
    let mut registry = ModuleRegistry::with_search_paths(SearchPaths::empty());

    let first = registry.load_memory("fx", &image).unwrap();
    first.unload().unwrap();

    let second = registry.load_memory("fx", &image).unwrap();
    assert!(second.is_loaded());
    assert_eq!(registry.loaded_modules(), vec!["fx"]);
}

#[test]
fn test_registry_from_config_file() {
    let path = require_fixture!();
    let dir = tempfile::tempdir().unwrap();

    let mut config = DllcallConfig::default();
    config.loader.use_default_paths = false;
    config.loader.search_paths.push(path.parent().unwrap().to_path_buf());
    config.modules.push(ModuleConfig {
        name: "fixture".to_string(),
        path: "testmod".to_string(),
        symbols: vec!["add2".to_string(), "sum15".to_string()],
    });
    let config_path = dir.path().join(dllcall::config::CONFIG_FILE_NAME);
    config.save(&config_path).unwrap();

    let loaded = DllcallConfig::load(&config_path).unwrap();
    let registry = ModuleRegistry::from_config(&loaded).unwrap();

    let module = registry.get("fixture").unwrap();
    assert_eq!(module.symbol_names(), vec!["add2", "sum15"]);
    let result = unsafe { registry.call("fixture:add2", &[Argument::I32(1), Argument::I32(2)]) }
        .unwrap();
    assert_eq!(result.as_i32(), 3);
}

#[test]
fn test_config_with_missing_symbol_fails() {
    let path = require_fixture!();
    let mut config = DllcallConfig::default();
    config.modules.push(ModuleConfig {
        name: "fixture".to_string(),
        path: path.display().to_string(),
        symbols: vec!["not_exported".to_string()],
    });
    let err = ModuleRegistry::from_config(&config).err().unwrap();
    assert!(matches!(err, FfiError::SymbolNotFound(_)));
}

#[test]
fn test_config_with_missing_module_fails() {
    let mut config = DllcallConfig::default();
    config.loader.use_default_paths = false;
    config.modules.push(ModuleConfig {
        name: "ghost".to_string(),
        path: "/nowhere/libghost.so".to_string(),
        symbols: vec![],
    });
    let err = ModuleRegistry::from_config(&config).err().unwrap();
    assert!(matches!(err, FfiError::Load(_)));
}
