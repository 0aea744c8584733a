//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Route library logs to the test output; `RUST_LOG=dllcall=trace` shows every call
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Path of the native fixture built by build.rs, if it was built
pub fn fixture_path() -> Option<PathBuf> {
    init_tracing();
    option_env!("DLLCALL_TEST_FIXTURE")
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Bail out of a test when the native fixture is unavailable
macro_rules! require_fixture {
    () => {
        match common::fixture_path() {
            Some(path) => path,
            None => {
                eprintln!("Native test fixture not built, skipping test");
                return;
            }
        }
    };
}
