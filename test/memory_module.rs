//! Memory-Backed Module Tests
//!
//! Loads the native fixture from a byte buffer instead of its file.

#[macro_use]
mod common;

use dllcall::{Argument, FfiError, Module};

#[test]
fn test_empty_image_fails_to_load() {
    let module = Module::from_memory(&[]);
    assert!(matches!(module.load().unwrap_err(), FfiError::Load(_)));
    assert!(!module.is_loaded());
}

#[test]
fn test_garbage_image_fails_to_load() {
    let err = Module::open_memory(b"definitely not a shared object").unwrap_err();
    assert!(matches!(err, FfiError::Load(_)));
}

#[test]
fn test_caller_buffer_changes_do_not_leak_in() {
    let mut image = vec![0x7f, b'E', b'L', b'F', 2, 1, 1, 0];
    let module = Module::from_memory(&image);
    image.iter_mut().for_each(|b| *b = 0);
    assert_eq!(module.image_bytes().unwrap(), &[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
}

#[cfg(target_os = "linux")]
#[test]
fn test_call_from_memory_image() {
    let path = require_fixture!();
    let mut image = std::fs::read(&path).unwrap();

    let module = Module::open_memory(&image).unwrap();
    let snapshot = module.image_bytes().unwrap().to_vec();

    // Scribbling over the caller's buffer must not affect the loaded module.
    image.iter_mut().for_each(|b| *b = 0xcc);
    assert_eq!(module.image_bytes().unwrap(), snapshot.as_slice());

    module.resolve(["add2"]).unwrap();
    let result = unsafe { module.call("add2", &[Argument::I32(2), Argument::I32(3)]) }.unwrap();
    assert_eq!(result.primary_word, 5);

    module.unload().unwrap();
    module.unload().unwrap();
    let err = unsafe { module.call("add2", &[Argument::I32(2), Argument::I32(3)]) }.unwrap_err();
    assert_eq!(err, FfiError::NotLoaded);
}

#[cfg(target_os = "linux")]
#[test]
fn test_two_memory_copies_are_independent() {
    let path = require_fixture!();
    let image = std::fs::read(&path).unwrap();

    let first = Module::open_memory(&image).unwrap();
    let second = Module::open_memory(&image).unwrap();
    first.resolve(["add2"]).unwrap();
    second.resolve(["add2"]).unwrap();

    first.unload().unwrap();
    let result = unsafe { second.call("add2", &[Argument::I32(1), Argument::I32(1)]) }.unwrap();
    assert_eq!(result.as_i32(), 2);
}
