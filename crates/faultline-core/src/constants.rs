//! # Signal Cause Codes
//!
//! Centralized `si_code` values for the fault kinds faultline handles.
//!
//! The `libc` crate does not export every one of these on every target, and
//! the numbering of `ILL_*` and `FPE_*` differs between Linux and the BSDs
//! (including macOS), so they are spelled out here per platform.
//!
//! ## Organization
//!
//! - Address-bearing signals
//! - `SIGSEGV` codes
//! - `SIGILL` codes
//! - `SIGBUS` codes
//! - `SIGFPE` codes
//! - Kernel-internal marker
//!
//! ## References
//!
//! - [sigaction(2)](https://man7.org/linux/man-pages/man2/sigaction.2.html)
//! - Linux `include/uapi/asm-generic/siginfo.h`
//! - XNU `bsd/sys/signal.h`

use libc::c_int;

// ============================================================================
// Address-bearing signals
// ============================================================================

/// Whether the kernel defines `si_addr` for `signal`.
///
/// Only these signals report the address of the fault (or of the faulting
/// instruction). Reading `si_addr` for anything else reads an unrelated union
/// member.
pub const fn is_address_bearing(signal: c_int) -> bool
{
    matches!(
        signal,
        libc::SIGILL | libc::SIGFPE | libc::SIGSEGV | libc::SIGBUS | libc::SIGTRAP
    )
}

// ============================================================================
// SIGSEGV
// ============================================================================

/// Address not mapped to any object
pub const SEGV_MAPERR: c_int = 1;
/// Invalid permissions for mapped object
pub const SEGV_ACCERR: c_int = 2;

// ============================================================================
// SIGILL
// ============================================================================

/// Illegal opcode
#[cfg(not(target_vendor = "apple"))]
pub const ILL_ILLOPC: c_int = 1;
/// Illegal operand
#[cfg(not(target_vendor = "apple"))]
pub const ILL_ILLOPN: c_int = 2;
/// Illegal addressing mode
#[cfg(not(target_vendor = "apple"))]
pub const ILL_ILLADR: c_int = 3;
/// Illegal trap
#[cfg(not(target_vendor = "apple"))]
pub const ILL_ILLTRP: c_int = 4;
/// Privileged opcode
#[cfg(not(target_vendor = "apple"))]
pub const ILL_PRVOPC: c_int = 5;

/// Illegal opcode
#[cfg(target_vendor = "apple")]
pub const ILL_ILLOPC: c_int = 1;
/// Illegal trap
#[cfg(target_vendor = "apple")]
pub const ILL_ILLTRP: c_int = 2;
/// Privileged opcode
#[cfg(target_vendor = "apple")]
pub const ILL_PRVOPC: c_int = 3;
/// Illegal operand
#[cfg(target_vendor = "apple")]
pub const ILL_ILLOPN: c_int = 4;
/// Illegal addressing mode
#[cfg(target_vendor = "apple")]
pub const ILL_ILLADR: c_int = 5;

/// Privileged register
pub const ILL_PRVREG: c_int = 6;
/// Coprocessor error
pub const ILL_COPROC: c_int = 7;
/// Internal stack error
pub const ILL_BADSTK: c_int = 8;

// ============================================================================
// SIGBUS
// ============================================================================

/// Invalid address alignment
pub const BUS_ADRALN: c_int = 1;
/// Nonexistent physical address
pub const BUS_ADRERR: c_int = 2;
/// Object-specific hardware error
pub const BUS_OBJERR: c_int = 3;

// ============================================================================
// SIGFPE
// ============================================================================

/// Integer divide by zero
#[cfg(not(target_vendor = "apple"))]
pub const FPE_INTDIV: c_int = 1;
/// Integer overflow
#[cfg(not(target_vendor = "apple"))]
pub const FPE_INTOVF: c_int = 2;
/// Floating-point divide by zero
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTDIV: c_int = 3;
/// Floating-point overflow
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTOVF: c_int = 4;
/// Floating-point underflow
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTUND: c_int = 5;
/// Floating-point inexact result
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTRES: c_int = 6;
/// Invalid floating-point operation
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTINV: c_int = 7;
/// Subscript out of range
#[cfg(not(target_vendor = "apple"))]
pub const FPE_FLTSUB: c_int = 8;

/// Floating-point divide by zero
#[cfg(target_vendor = "apple")]
pub const FPE_FLTDIV: c_int = 1;
/// Floating-point overflow
#[cfg(target_vendor = "apple")]
pub const FPE_FLTOVF: c_int = 2;
/// Floating-point underflow
#[cfg(target_vendor = "apple")]
pub const FPE_FLTUND: c_int = 3;
/// Floating-point inexact result
#[cfg(target_vendor = "apple")]
pub const FPE_FLTRES: c_int = 4;
/// Invalid floating-point operation
#[cfg(target_vendor = "apple")]
pub const FPE_FLTINV: c_int = 5;
/// Subscript out of range
#[cfg(target_vendor = "apple")]
pub const FPE_FLTSUB: c_int = 6;
/// Integer divide by zero
#[cfg(target_vendor = "apple")]
pub const FPE_INTDIV: c_int = 7;
/// Integer overflow
#[cfg(target_vendor = "apple")]
pub const FPE_INTOVF: c_int = 8;

// ============================================================================
// Kernel-internal marker
// ============================================================================

/// `si_code` the Linux kernel uses for signals it raises on its own behalf
///
/// A user-mode `cli`/`hlt` on x86_64 raises a general protection fault, which
/// Linux delivers as `SIGSEGV` with this code and a null `si_addr` rather than
/// as `SIGILL`/`ILL_PRVOPC`. Other platforms have no such marker.
#[cfg(target_os = "linux")]
pub const SI_KERNEL: Option<c_int> = Some(0x80);

/// `si_code` the kernel uses for signals it raises on its own behalf
#[cfg(not(target_os = "linux"))]
pub const SI_KERNEL: Option<c_int> = None;

/// Whether `code` is the kernel-internal marker on this platform
pub const fn is_kernel_marker(code: c_int) -> bool
{
    match SI_KERNEL {
        Some(marker) => code == marker,
        None => false,
    }
}
