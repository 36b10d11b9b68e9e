// =============================================================================
// Pulse - Kernel Build Script
// =============================================================================
// Picks the linker script for the selected board. Raspberry Pi firmware loads
// kernel8.img at 0x80000; QEMU virt loads the ELF at 0x4008_0000.
// =============================================================================

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=link-raspi.ld");
    println!("cargo:rerun-if-changed=link-virt.ld");

    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if os != "none" {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let script = if env::var_os("CARGO_FEATURE_BOARD_VIRT").is_some() {
        "link-virt.ld"
    } else {
        "link-raspi.ld"
    };

    println!("cargo:rustc-link-arg-bins=-T{}", manifest_dir.join(script).display());
}
