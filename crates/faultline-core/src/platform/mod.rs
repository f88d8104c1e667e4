//! # Platform-Specific Implementations
//!
//! Everything that depends on the ABI layout of `siginfo_t` and
//! `ucontext_t`, or on how signal actions are installed, lives here:
//!
//! - **linux**: `uc_mcontext` is embedded in `ucontext_t`; the program counter
//!   is `gregs[REG_RIP]` on x86_64 and `pc` on aarch64.
//!   - See: [getcontext(3)](https://man7.org/linux/man-pages/man3/getcontext.3.html)
//! - **apple**: `uc_mcontext` is a pointer to `__darwin_mcontext64`; the
//!   program counter is `__ss.__rip` / `__ss.__pc`.
//! - **sigaction**: [`PosixSignals`], the `sigaction(2)` backend used by the
//!   registry.
//!
//! Nothing above [`crate::context`] touches these functions directly.

#[cfg(target_vendor = "apple")]
mod apple;
#[cfg(target_os = "linux")]
mod linux;
pub mod sigaction;

#[cfg(not(all(
    any(target_os = "linux", target_vendor = "apple"),
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
compile_error!("faultline supports Linux and macOS on x86_64 and aarch64 only");

#[cfg(target_vendor = "apple")]
pub(crate) use apple::{fault_address, program_counter_slot};
#[cfg(target_os = "linux")]
pub(crate) use linux::{fault_address, program_counter_slot};
pub use sigaction::PosixSignals;

/// Where the saved program counter lives in this platform's `ucontext_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounterLayout
{
    /// Register name, e.g. `"rip"`
    pub register: &'static str,
    /// Field path inside `ucontext_t`
    pub location: &'static str,
}

/// Program counter layout for the current target
#[cfg(target_vendor = "apple")]
pub const PROGRAM_COUNTER: ProgramCounterLayout = apple::PROGRAM_COUNTER;

/// Program counter layout for the current target
#[cfg(target_os = "linux")]
pub const PROGRAM_COUNTER: ProgramCounterLayout = linux::PROGRAM_COUNTER;
