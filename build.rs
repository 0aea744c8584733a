//! Build script for the dllcall test fixture
//!
//! Compiles `test/fixtures/testmod.c` into a shared library with the host C
//! compiler so the integration tests have a real native module to load. A
//! missing or failing compiler is not fatal: the fixture-backed tests skip.

use std::env;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let source = Path::new("test/fixtures/testmod.c");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=test/fixtures/testmod.c");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let file_name = match target_os.as_str() {
        "windows" => "testmod.dll",
        "macos" | "ios" => "libtestmod.dylib",
        _ => "libtestmod.so",
    };
    let output = out_dir.join(file_name);

    if build_shared(source, &output) {
        println!("cargo:rustc-env=DLLCALL_TEST_FIXTURE={}", output.display());
    } else {
        println!("cargo:warning=could not build native test fixture, fixture tests will be skipped");
    }
}

/// Build a shared library from a single C file
fn build_shared(source: &Path, output: &Path) -> bool {
    let compiler = match cc::Build::new().cargo_metadata(false).try_get_compiler() {
        Ok(compiler) => compiler,
        Err(e) => {
            eprintln!("Warning: no C compiler available: {}", e);
            return false;
        }
    };

    let mut cmd = compiler.to_command();
    if compiler.is_like_msvc() {
        cmd.arg("/nologo")
            .arg("/LD")
            .arg(source)
            .arg(format!("/Fe{}", output.display()));
    } else {
        cmd.args(["-shared", "-fPIC", "-O1", "-o"])
            .arg(output)
            .arg(source);
    }

    match cmd.status() {
        Ok(status) if status.success() => true,
        Ok(status) => {
            eprintln!("Warning: fixture compile exited with {}", status);
            false
        }
        Err(e) => {
            eprintln!("Warning: failed to run C compiler: {}", e);
            false
        }
    }
}
