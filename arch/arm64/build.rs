// =============================================================================
// Pulse - ARM64 Build Script
// =============================================================================
// This build script compiles the assembly boot code and links it with Rust.
// Host builds (unit tests) skip it: there is nothing to boot.
// =============================================================================

use std::env;
use std::path::PathBuf;

fn main() {
    // Tell Cargo to rerun this if assembly files change
    println!("cargo:rerun-if-changed=src/boot.S");
    println!("cargo:rerun-if-changed=src/exception.S");

    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if arch != "aarch64" || os != "none" {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let arch_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Compile boot.S and exception.S
    cc::Build::new()
        .file(arch_dir.join("src/boot.S"))
        .file(arch_dir.join("src/exception.S"))
        .flag("-c")
        .flag("-target")
        .flag("aarch64-unknown-none")
        .compile("boot");

    // Link the compiled object file
    println!("cargo:rustc-link-search=native={}", out_dir.display());
    println!("cargo:rustc-link-lib=static=boot");
}
