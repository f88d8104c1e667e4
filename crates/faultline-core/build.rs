//! Build script for faultline-core
//!
//! This script checks system requirements before compilation:
//! - Minimum Rust version (`offset_of!` is used for the layout assertions)
//! - Target platform and architecture
//!
//! ## Requirements
//!
//! - **Rust**: 1.77.0 or newer
//! - **OS**: Linux or macOS (`SA_SIGINFO` handlers with a writable `ucontext_t`)
//! - **Architecture**: x86_64 or aarch64

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    // offset_of! was stabilized in 1.77.0
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 77, 0);

        if rustc_version < min_rust_version {
            panic!(
                "faultline-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    // Cargo exposes the target through env vars; cfg!() here would describe the host
    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let vendor = std::env::var("CARGO_CFG_TARGET_VENDOR").unwrap_or_default();
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    if os != "linux" && vendor != "apple" {
        println!("cargo:warning=faultline-core targets Linux and macOS, found target os `{os}`");
    }
    if arch != "x86_64" && arch != "aarch64" {
        println!("cargo:warning=faultline-core has no program counter layout for `{arch}`");
    }
}
