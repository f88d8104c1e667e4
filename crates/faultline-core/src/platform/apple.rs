//! macOS `ucontext_t` / `siginfo_t` access.
//!
//! Unlike Linux, `uc_mcontext` is a pointer to a `__darwin_mcontext64`
//! that the kernel places next to the `ucontext_t` in the signal frame.
//! `sigreturn` restores the thread state from the `__ss` member.

use std::ffi::c_void;
use std::ptr::addr_of_mut;

use super::ProgramCounterLayout;

#[cfg(target_arch = "x86_64")]
pub(crate) const PROGRAM_COUNTER: ProgramCounterLayout = ProgramCounterLayout {
    register: "rip",
    location: "uc_mcontext->__ss.__rip",
};

#[cfg(target_arch = "aarch64")]
pub(crate) const PROGRAM_COUNTER: ProgramCounterLayout = ProgramCounterLayout {
    register: "pc",
    location: "uc_mcontext->__ss.__pc",
};

/// Pointer to the saved program counter inside `uc`.
///
/// # Safety
///
/// `uc` must point to a live, writable `ucontext_t` whose `uc_mcontext`
/// points to a live machine context.
#[cfg(target_arch = "x86_64")]
pub(crate) unsafe fn program_counter_slot(uc: *mut libc::ucontext_t) -> *mut u64
{
    // SAFETY: caller guarantees both levels of the context are valid.
    unsafe {
        let mcontext = (*uc).uc_mcontext;
        addr_of_mut!((*mcontext).__ss.__rip)
    }
}

/// Pointer to the saved program counter inside `uc`.
///
/// # Safety
///
/// `uc` must point to a live, writable `ucontext_t` whose `uc_mcontext`
/// points to a live machine context.
#[cfg(target_arch = "aarch64")]
pub(crate) unsafe fn program_counter_slot(uc: *mut libc::ucontext_t) -> *mut u64
{
    // SAFETY: caller guarantees both levels of the context are valid.
    unsafe {
        let mcontext = (*uc).uc_mcontext;
        addr_of_mut!((*mcontext).__ss.__pc)
    }
}

/// Raw `si_addr` of `info`.
///
/// # Safety
///
/// `info` must describe an address-bearing signal.
pub(crate) unsafe fn fault_address(info: &libc::siginfo_t) -> *mut c_void
{
    info.si_addr
}
